//! PDF document writer.
//!
//! Serializes a table of indirect objects into a complete PDF file: header,
//! body, cross-reference section and trailer. Two layouts are supported:
//!
//! - **Compact** (default): non-stream objects are packed into Flate-compressed
//!   object streams and indexed by a cross-reference stream (PDF 1.5+).
//! - **Classic**: every object is written at top level and indexed by a
//!   traditional `xref` table.
//!
//! An [`EncryptionWriteHandler`] can be attached; every object except the
//! encryption dictionary and the cross-reference stream is then encrypted as
//! it is written.

use super::object_serializer::ObjectSerializer;
use crate::decoders::{encode_stream, flate_encode, DecodeParams};
use crate::encryption::EncryptionWriteHandler;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::ObjectStreamBuilder;
use byteorder::{BigEndian, WriteBytesExt};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;

/// Configuration for PDF output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// PDF version written in the header (e.g., "1.7")
    pub version: String,
    /// Pack non-stream objects into object streams (requires `xref_stream`)
    pub object_streams: bool,
    /// Maximum number of objects per object stream
    pub objects_per_stream: usize,
    /// Index objects with a cross-reference stream instead of a table
    pub xref_stream: bool,
    /// Flate-compress streams that carry no filter
    pub compress_streams: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            object_streams: true,
            objects_per_stream: 100,
            xref_stream: true,
            compress_streams: true,
        }
    }
}

impl WriterConfig {
    /// Classic layout: top-level objects and an `xref` table.
    pub fn classic() -> Self {
        Self {
            version: "1.4".to_string(),
            object_streams: false,
            xref_stream: false,
            ..Self::default()
        }
    }

    /// Set the header version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Enable or disable object streams.
    pub fn with_object_streams(mut self, enable: bool) -> Self {
        self.object_streams = enable;
        self
    }

    /// Set the object stream capacity.
    pub fn with_objects_per_stream(mut self, count: usize) -> Self {
        self.objects_per_stream = count.max(1);
        self
    }

    /// Choose between an xref stream and a classic table.
    pub fn with_xref_stream(mut self, enable: bool) -> Self {
        self.xref_stream = enable;
        self
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, streams without a `/Filter` are compressed with
    /// FlateDecode if that makes them smaller.
    pub fn with_compress_streams(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }
}

/// Where an object ended up in the output.
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Byte offset and generation of a top-level object
    Direct(usize, u16),
    /// Object stream number and index within it
    Packed(u32, u16),
}

/// Writes a PDF from a table of indirect objects.
///
/// # Example
///
/// ```
/// use pdf_press::object::{Dict, Object, ObjectRef};
/// use pdf_press::writer::{PdfWriter, WriterConfig};
///
/// let mut writer = PdfWriter::new(WriterConfig::default());
/// let mut pages = Dict::new();
/// pages.insert("Type".to_string(), Object::name("Pages"));
/// pages.insert("Kids".to_string(), Object::Array(vec![]));
/// pages.insert("Count".to_string(), Object::Integer(0));
/// let pages = writer.add(Object::Dictionary(pages));
///
/// let mut catalog = Dict::new();
/// catalog.insert("Type".to_string(), Object::name("Catalog"));
/// catalog.insert("Pages".to_string(), Object::Reference(pages));
/// let root = writer.add(Object::Dictionary(catalog));
/// writer.set_root(root);
///
/// let bytes = writer.finish().unwrap();
/// assert!(bytes.starts_with(b"%PDF-1.7"));
/// ```
#[derive(Debug)]
pub struct PdfWriter {
    config: WriterConfig,
    /// Objects by number, with their generation
    objects: BTreeMap<u32, (u16, Object)>,
    root: Option<ObjectRef>,
    info: Option<ObjectRef>,
    file_id: Option<Vec<u8>>,
    /// Encryption dictionary object number and the handler
    encryption: Option<(u32, EncryptionWriteHandler)>,
}

impl PdfWriter {
    /// Create a writer.
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            objects: BTreeMap::new(),
            root: None,
            info: None,
            file_id: None,
            encryption: None,
        }
    }

    /// Number of the next object `add` will allocate.
    pub fn next_id(&self) -> u32 {
        self.objects.keys().next_back().map_or(1, |id| id + 1)
    }

    /// Append an object under a fresh number.
    pub fn add(&mut self, obj: Object) -> ObjectRef {
        let id = self.next_id();
        self.objects.insert(id, (0, obj));
        ObjectRef::new(id, 0)
    }

    /// Store an object under a given number, replacing any previous one.
    pub fn insert(&mut self, obj_ref: ObjectRef, obj: Object) {
        self.objects.insert(obj_ref.id, (obj_ref.gen, obj));
    }

    /// Number of objects queued.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if no objects are queued.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Set the document catalog.
    pub fn set_root(&mut self, root: ObjectRef) {
        self.root = Some(root);
    }

    /// Set the document information dictionary.
    pub fn set_info(&mut self, info: ObjectRef) {
        self.info = Some(info);
    }

    /// Use a fixed file identifier instead of one derived from the body.
    pub fn set_file_id(&mut self, id: Vec<u8>) {
        self.file_id = Some(id);
    }

    /// Encrypt the output.
    ///
    /// `encrypt_dict` is stored as a new object and referenced from the
    /// trailer. The handler must have been created with the id passed to
    /// [`set_file_id`](Self::set_file_id).
    pub fn set_encryption(&mut self, encrypt_dict: Dict, handler: EncryptionWriteHandler) -> ObjectRef {
        let encrypt_ref = self.add(Object::Dictionary(encrypt_dict));
        self.encryption = Some((encrypt_ref.id, handler));
        encrypt_ref
    }

    /// Serialize everything into PDF bytes.
    ///
    /// # Errors
    ///
    /// `InvalidPdf` if no root was set or encryption was requested without a
    /// fixed file identifier.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let root = self
            .root
            .ok_or_else(|| Error::InvalidPdf("writer has no document catalog".to_string()))?;
        if self.encryption.is_some() && self.file_id.is_none() {
            return Err(Error::InvalidPdf("encrypted output needs a fixed file identifier".to_string()));
        }

        let serializer = ObjectSerializer::compact();
        let use_objstm = self.config.object_streams && self.config.xref_stream;
        let encrypt_id = self.encryption.as_ref().map(|(id, _)| *id);
        let mut next_id = self.next_id();

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", self.config.version)?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut slots: BTreeMap<u32, Slot> = BTreeMap::new();
        let mut packed: Vec<(u32, Object)> = Vec::new();

        for (id, (gen, obj)) in std::mem::take(&mut self.objects) {
            let packable = use_objstm && gen == 0 && !obj.is_stream() && Some(id) != encrypt_id;
            if packable {
                packed.push((id, obj));
                continue;
            }

            let obj = self.prepare_stream(obj)?;
            let obj = self.encrypt(obj, id, gen, encrypt_id)?;
            slots.insert(id, Slot::Direct(output.len(), gen));
            output.extend_from_slice(&serializer.serialize_indirect(id, gen, &obj));
        }

        for chunk in packed.chunks(self.config.objects_per_stream.max(1)) {
            let stream_id = next_id;
            next_id += 1;

            let mut builder = ObjectStreamBuilder::new();
            for (id, obj) in chunk {
                let index = builder.add(*id, obj)?;
                slots.insert(*id, Slot::Packed(stream_id, index));
            }
            let stream = builder.build(self.config.compress_streams)?;
            let stream = self.encrypt(stream, stream_id, 0, encrypt_id)?;

            slots.insert(stream_id, Slot::Direct(output.len(), 0));
            output.extend_from_slice(&serializer.serialize_indirect(stream_id, 0, &stream));
        }
        if !packed.is_empty() {
            log::debug!("Packed {} objects into object streams", packed.len());
        }

        let file_id = match &self.file_id {
            Some(id) => id.clone(),
            None => Sha256::digest(&output)[..16].to_vec(),
        };

        let mut trailer = Dict::new();
        trailer.insert("Root".to_string(), Object::Reference(root));
        if let Some(info) = self.info {
            trailer.insert("Info".to_string(), Object::Reference(info));
        }
        if let Some(id) = encrypt_id {
            trailer.insert("Encrypt".to_string(), Object::Reference(ObjectRef::new(id, 0)));
        }
        trailer.insert(
            "ID".to_string(),
            Object::Array(vec![Object::String(file_id.clone()), Object::String(file_id)]),
        );

        let xref_start = output.len();
        if self.config.xref_stream {
            let xref_id = next_id;
            slots.insert(xref_id, Slot::Direct(xref_start, 0));
            let xref = build_xref_stream(&slots, trailer)?;
            output.extend_from_slice(&serializer.serialize_indirect(xref_id, 0, &xref));
        } else {
            write_xref_table(&mut output, &slots)?;
            trailer.insert("Size".to_string(), Object::Integer(table_size(&slots) as i64));
            writeln!(output, "trailer")?;
            output.extend_from_slice(&serializer.serialize(&Object::Dictionary(trailer)));
            writeln!(output)?;
        }

        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        Ok(output)
    }

    /// Save the PDF to a file.
    pub fn save(self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Flate-compress a filterless stream when configured and worthwhile.
    fn prepare_stream(&self, obj: Object) -> Result<Object> {
        if !self.config.compress_streams {
            return Ok(obj);
        }
        match obj {
            Object::Stream { mut dict, data }
                if !dict.contains_key("Filter")
                    && !data.is_empty()
                    && dict.get("Type").and_then(Object::as_name) != Some("Metadata") =>
            {
                let compressed = flate_encode(&data)?;
                if compressed.len() < data.len() {
                    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                    dict.remove("DecodeParms");
                    Ok(Object::stream(dict, compressed))
                } else {
                    Ok(Object::Stream { dict, data })
                }
            },
            other => Ok(other),
        }
    }

    fn encrypt(&self, mut obj: Object, id: u32, gen: u16, encrypt_id: Option<u32>) -> Result<Object> {
        if let Some((_, handler)) = &self.encryption {
            if Some(id) != encrypt_id {
                handler.encrypt_object(&mut obj, id, gen)?;
            }
        }
        Ok(obj)
    }
}

/// Number of entries the xref section must cover (highest number + 1).
fn table_size(slots: &BTreeMap<u32, Slot>) -> u32 {
    slots.keys().next_back().map_or(1, |id| id + 1)
}

/// Write a classic `xref` table with one subsection from object 0.
fn write_xref_table(output: &mut Vec<u8>, slots: &BTreeMap<u32, Slot>) -> Result<()> {
    let size = table_size(slots);
    writeln!(output, "xref")?;
    writeln!(output, "0 {}", size)?;
    for id in 0..size {
        match slots.get(&id) {
            Some(Slot::Direct(offset, gen)) => write!(output, "{:010} {:05} n\r\n", offset, gen)?,
            _ if id == 0 => write!(output, "0000000000 65535 f\r\n")?,
            _ => write!(output, "0000000000 00000 f\r\n")?,
        }
    }
    Ok(())
}

/// Build the `/Type /XRef` stream covering every slot, the stream itself included.
fn build_xref_stream(slots: &BTreeMap<u32, Slot>, trailer: Dict) -> Result<Object> {
    let size = table_size(slots);
    let max_field = slots
        .values()
        .map(|slot| match slot {
            Slot::Direct(offset, _) => *offset as u64,
            Slot::Packed(stream, _) => *stream as u64,
        })
        .max()
        .unwrap_or(0);
    let w2 = (1..=8).find(|&n| n == 8 || max_field < 1u64 << (8 * n)).unwrap_or(8);

    let mut rows = Vec::with_capacity(size as usize * (3 + w2));
    for id in 0..size {
        let (kind, field2, field3) = match slots.get(&id) {
            Some(Slot::Direct(offset, gen)) => (1u8, *offset as u64, *gen),
            Some(Slot::Packed(stream, index)) => (2u8, *stream as u64, *index),
            None if id == 0 => (0u8, 0, 65535),
            None => (0u8, 0, 0),
        };
        rows.push(kind);
        rows.write_uint::<BigEndian>(field2, w2)?;
        rows.write_u16::<BigEndian>(field3)?;
    }

    let params = DecodeParams::png_up(1 + w2 + 2);
    let data = encode_stream(&rows, &["FlateDecode".to_string()], &[Some(params.clone())])?;

    let mut dict = trailer;
    dict.insert("Type".to_string(), Object::name("XRef"));
    dict.insert("Size".to_string(), Object::Integer(size as i64));
    dict.insert(
        "W".to_string(),
        Object::Array(vec![Object::Integer(1), Object::Integer(w2 as i64), Object::Integer(2)]),
    );
    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
    dict.insert("DecodeParms".to_string(), Object::Dictionary(params.to_dict()));

    Ok(Object::stream(dict, data))
}
