//! PDF document model.
//!
//! A [`PdfDocument`] owns the raw bytes of one file together with its
//! cross-reference index. Objects are parsed on first access and cached;
//! objects stored in object streams are reached through their container.
//! Encrypted documents are decrypted object by object as they are loaded.

use crate::encryption::{Algorithm, EncryptionHandler};
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::parse_object_stream;
use crate::parser::{parse_indirect_object, to_error};
use crate::parser_config::ParserOptions;
use crate::xref::{find_xref_offset, load_xref_chain, CrossRefTable, XRefEntryType};
use crate::xref_reconstruction::reconstruct_xref;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Page attributes a page inherits from its ancestors in the page tree.
///
/// PDF Spec: ISO 32000-1:2008, Table 30 - Entries in a page object
pub const INHERITABLE_PAGE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// How far into the file the header may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A leaf of the page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Where the page object lives in its document
    pub id: ObjectRef,
    /// Page dictionary with inherited attributes filled in
    pub dict: Dict,
}

/// PDF document.
///
/// # Example
///
/// ```no_run
/// use pdf_press::document::PdfDocument;
///
/// let mut doc = PdfDocument::open("sample.pdf")?;
/// println!("PDF version: {}", doc.version());
/// println!("Page count: {}", doc.page_count()?);
/// # Ok::<(), pdf_press::error::Error>(())
/// ```
pub struct PdfDocument {
    /// Whole file contents
    data: Bytes,
    /// Header version, e.g. "1.7"
    version: String,
    /// Cross-reference index
    xref: CrossRefTable,
    /// Trailer dictionary
    trailer: Dict,
    options: ParserOptions,
    /// Objects loaded so far
    cache: HashMap<u32, Object>,
    /// Parsed object streams, by container number
    object_streams: HashMap<u32, Vec<(u32, Object)>>,
    /// Objects currently being loaded (cycle detection)
    resolving: HashSet<u32>,
    /// Present when the trailer has /Encrypt
    encryption: Option<EncryptionHandler>,
    /// Object number of the encryption dictionary, which is never decrypted
    encrypt_id: Option<u32>,
    /// True when the xref was rebuilt by scanning
    reconstructed: bool,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.version)
            .field("xref_entries", &self.xref.len())
            .field("cached_objects", &self.cache.len())
            .field("encrypted", &self.encryption.is_some())
            .field("reconstructed", &self.reconstructed)
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Open a PDF document from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::load(data)
    }

    /// Load a document from memory with lenient parsing and no password.
    pub fn load(data: impl Into<Bytes>) -> Result<Self> {
        Self::load_with(data, &ParserOptions::default(), None)
    }

    /// Load a document from memory.
    ///
    /// This function:
    /// 1. Validates the `%PDF-` header
    /// 2. Reads the cross-reference chain from `startxref`, or rebuilds it by
    ///    scanning the file when the chain is unusable
    /// 3. Sets up decryption when the trailer has `/Encrypt`
    ///
    /// An encrypted document is authenticated with `password`, or with the
    /// empty password when none is given. Without a password, a document
    /// that needs one still loads; [`is_authenticated`](Self::is_authenticated)
    /// then reports false and object contents stay encrypted.
    ///
    /// # Errors
    ///
    /// - `EmptyInput` for zero bytes
    /// - `InvalidHeader` if no `%PDF-` header is found
    /// - `CorruptXRef` if the xref chain is broken and scanning finds nothing
    /// - `WrongPassword` if `password` is given and rejected
    pub fn load_with(data: impl Into<Bytes>, options: &ParserOptions, password: Option<&str>) -> Result<Self> {
        let data: Bytes = data.into();
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        let version = parse_header(&data)?;

        let (xref, reconstructed) = load_xref(&data, options)?;
        let trailer = xref
            .trailer()
            .cloned()
            .ok_or_else(|| Error::CorruptXRef("no trailer dictionary".to_string()))?;

        let mut doc = Self {
            data,
            version,
            xref,
            trailer,
            options: *options,
            cache: HashMap::new(),
            object_streams: HashMap::new(),
            resolving: HashSet::new(),
            encryption: None,
            encrypt_id: None,
            reconstructed,
        };
        doc.init_encryption(password)?;

        log::debug!("Loaded {:?}", doc);
        Ok(doc)
    }

    fn init_encryption(&mut self, password: Option<&str>) -> Result<()> {
        let Some(encrypt_entry) = self.trailer.get("Encrypt").cloned() else {
            return Ok(());
        };

        let file_id = self.file_id().unwrap_or_else(|| {
            log::warn!("Missing or invalid /ID entry in trailer, using empty file ID");
            Vec::new()
        });

        let encrypt_obj = match encrypt_entry {
            Object::Reference(r) => {
                self.encrypt_id = Some(r.id);
                self.get_object(r)?
            },
            Object::Dictionary(_) => encrypt_entry,
            other => {
                return Err(Error::InvalidPdf(format!("Invalid /Encrypt entry type: {}", other.type_name())));
            },
        };

        let mut handler = EncryptionHandler::new(&encrypt_obj, file_id)?;
        match handler.authenticate(password.unwrap_or("")) {
            Ok(()) => log::info!("Authenticated encrypted document"),
            Err(Error::WrongPassword) if password.is_none() => {
                log::warn!("PDF is encrypted and requires a password");
            },
            Err(e) => return Err(e),
        }

        // Anything cached while loading /Encrypt was read without decryption
        self.cache.clear();
        self.object_streams.clear();
        self.encryption = Some(handler);
        Ok(())
    }

    /// Header version, e.g. "1.7".
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Parser options this document was loaded with.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// True when the xref was rebuilt by scanning the file.
    pub fn was_reconstructed(&self) -> bool {
        self.reconstructed
    }

    /// True when the trailer names an encryption dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// True unless the document is encrypted and no password was accepted.
    pub fn is_authenticated(&self) -> bool {
        self.encryption.as_ref().map_or(true, EncryptionHandler::is_authenticated)
    }

    /// Algorithm the document is encrypted with.
    pub fn encryption_algorithm(&self) -> Option<Algorithm> {
        self.encryption.as_ref().map(EncryptionHandler::algorithm)
    }

    /// The decryption state, if encrypted.
    pub fn encryption_handler(&self) -> Option<&EncryptionHandler> {
        self.encryption.as_ref()
    }

    /// Object number of the encryption dictionary.
    pub fn encrypt_dict_id(&self) -> Option<u32> {
        self.encrypt_id
    }

    /// First element of the trailer `/ID` array.
    pub fn file_id(&self) -> Option<Vec<u8>> {
        self.trailer
            .get("ID")
            .and_then(Object::as_array)
            .and_then(|ids| ids.first())
            .and_then(Object::as_string)
            .map(<[u8]>::to_vec)
    }

    /// References of every in-use object in the xref, in number order.
    pub fn object_refs(&self) -> Vec<ObjectRef> {
        let mut refs: Vec<ObjectRef> = self
            .xref
            .entries
            .iter()
            .filter(|(_, e)| e.in_use && e.entry_type != XRefEntryType::Free)
            .map(|(&id, e)| match e.entry_type {
                XRefEntryType::Compressed => ObjectRef::new(id, 0),
                _ => ObjectRef::new(id, e.generation),
            })
            .collect();
        refs.sort();
        refs
    }

    /// Number of in-use objects.
    pub fn object_count(&self) -> usize {
        self.object_refs().len()
    }

    /// Load an indirect object, parsing it on first access.
    ///
    /// # Errors
    ///
    /// - `ObjectNotFound` if the xref has no live entry for it or the entry
    ///   points at a different object
    /// - `CircularReference` if loading it requires itself (an object stream
    ///   stored in itself, a self-referential `/Length`)
    /// - `RecursionLimitExceeded` past `max_recursion_depth` nested loads
    pub fn get_object(&mut self, obj_ref: ObjectRef) -> Result<Object> {
        if let Some(cached) = self.cache.get(&obj_ref.id) {
            return Ok(cached.clone());
        }

        if self.resolving.contains(&obj_ref.id) {
            log::error!("Circular reference detected for object {}", obj_ref);
            return Err(Error::CircularReference(obj_ref));
        }
        if self.resolving.len() as u32 >= self.options.max_recursion_depth {
            return Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth));
        }

        let entry = match self.xref.get(obj_ref.id) {
            Some(entry) if entry.in_use && entry.entry_type != XRefEntryType::Free => *entry,
            _ => return Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen)),
        };

        self.resolving.insert(obj_ref.id);
        let result = match entry.entry_type {
            XRefEntryType::Compressed => {
                self.load_compressed_object(obj_ref, entry.offset as u32, entry.generation)
            },
            _ => self.load_uncompressed_object(obj_ref, entry.offset as usize),
        };
        self.resolving.remove(&obj_ref.id);

        let obj = result?;
        self.cache.insert(obj_ref.id, obj.clone());
        Ok(obj)
    }

    fn load_uncompressed_object(&mut self, obj_ref: ObjectRef, offset: usize) -> Result<Object> {
        let input = self.data.slice(offset.min(self.data.len())..);
        if input.is_empty() {
            log::warn!("Object {} offset {} is past end of file", obj_ref, offset);
            return Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen));
        }

        let (found, mut obj) = match parse_indirect_object(&input, &self.options) {
            Ok((_, parsed)) => parsed,
            Err(e) => return Err(to_error(&input, offset, e, self.options.max_nesting)),
        };
        if found.id != obj_ref.id {
            log::warn!("Xref entry for {} points at object {}", obj_ref, found);
            return Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen));
        }

        self.reconcile_stream_length(&mut obj)?;

        if let Some(handler) = &self.encryption {
            if handler.is_authenticated() && self.encrypt_id != Some(obj_ref.id) {
                handler.decrypt_object(&mut obj, found)?;
            }
        }
        Ok(obj)
    }

    /// Trim stream data to an indirect `/Length` once it can be resolved.
    fn reconcile_stream_length(&mut self, obj: &mut Object) -> Result<()> {
        let length_ref = match obj {
            Object::Stream { dict, .. } => match dict.get("Length") {
                Some(Object::Reference(r)) => *r,
                _ => return Ok(()),
            },
            _ => return Ok(()),
        };

        let length = match self.get_object(length_ref) {
            Ok(Object::Integer(n)) if n >= 0 => n as usize,
            Ok(_) | Err(Error::ObjectNotFound(..)) => return Ok(()),
            Err(e) => return Err(e),
        };

        if let Object::Stream { dict, data } = obj {
            if length <= data.len() {
                data.truncate(length);
            } else {
                log::debug!("Indirect /Length {} exceeds scanned data {}", length, data.len());
            }
            dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
        }
        Ok(())
    }

    fn load_compressed_object(&mut self, obj_ref: ObjectRef, stream_id: u32, index: u16) -> Result<Object> {
        if !self.object_streams.contains_key(&stream_id) {
            let container = self.get_object(ObjectRef::new(stream_id, 0))?;
            let members = parse_object_stream(&container, &self.options)?;
            self.object_streams.insert(stream_id, members);
        }
        let members = &self.object_streams[&stream_id];

        let member = match members.get(index as usize) {
            Some((id, obj)) if *id == obj_ref.id => Some(obj),
            _ => members.iter().find(|(id, _)| *id == obj_ref.id).map(|(_, obj)| obj),
        };
        member
            .cloned()
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    /// Follow references until a direct object is reached.
    ///
    /// Unresolvable references read as `Null`.
    pub fn resolve(&mut self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        for _ in 0..self.options.max_recursion_depth {
            let Object::Reference(r) = current else {
                return Ok(current);
            };
            current = match self.get_object(r) {
                Ok(next) => next,
                Err(e @ (Error::ObjectNotFound(..) | Error::ParseError { .. } | Error::CircularReference(_))) => {
                    log::debug!("Reference {} resolves to null: {}", r, e);
                    Object::Null
                },
                Err(e) => return Err(e),
            };
        }
        Err(Error::RecursionLimitExceeded(self.options.max_recursion_depth))
    }

    /// The document catalog (`/Root`).
    pub fn catalog(&mut self) -> Result<Dict> {
        let root = self
            .trailer
            .get("Root")
            .cloned()
            .ok_or_else(|| Error::InvalidPdf("Trailer has no /Root".to_string()))?;
        match self.resolve(&root)? {
            Object::Dictionary(dict) => Ok(dict),
            other => Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// All pages in document order, with inherited attributes flattened.
    ///
    /// # Errors
    ///
    /// `CorruptXRef` if a page tree node is reached twice (a `/Kids` cycle).
    pub fn pages(&mut self) -> Result<Vec<Page>> {
        let catalog = self.catalog()?;
        let Some(Object::Reference(root_ref)) = catalog.get("Pages").cloned() else {
            log::warn!("Catalog has no /Pages reference, treating document as empty");
            return Ok(Vec::new());
        };

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(ObjectRef, Dict)> = vec![(root_ref, Dict::new())];

        while let Some((node_ref, inherited)) = stack.pop() {
            if !visited.insert(node_ref) {
                return Err(Error::CorruptXRef(format!("page tree cycle at object {}", node_ref)));
            }

            let mut node = match self.resolve(&Object::Reference(node_ref))? {
                Object::Dictionary(dict) => dict,
                other => {
                    log::warn!("Page tree node {} is a {}, skipping", node_ref, other.type_name());
                    continue;
                },
            };

            let is_tree_node = match node.get("Type").and_then(Object::as_name) {
                Some("Pages") => true,
                Some(_) => false,
                None => node.contains_key("Kids"),
            };

            if !is_tree_node {
                for key in INHERITABLE_PAGE_ATTRIBUTES {
                    if let (false, Some(value)) = (node.contains_key(key), inherited.get(key)) {
                        node.insert(key.to_string(), value.clone());
                    }
                }
                pages.push(Page { id: node_ref, dict: node });
                continue;
            }

            let mut child_inherited = inherited;
            for key in INHERITABLE_PAGE_ATTRIBUTES {
                if let Some(value) = node.get(key) {
                    let value = self.resolve(value)?;
                    child_inherited.insert(key.to_string(), value);
                }
            }

            let kids = match node.get("Kids").map(|k| self.resolve(k)).transpose()? {
                Some(Object::Array(kids)) => kids,
                _ => {
                    log::warn!("Pages node {} missing /Kids array", node_ref);
                    continue;
                },
            };
            for kid in kids.iter().rev() {
                match kid {
                    Object::Reference(kid_ref) => stack.push((*kid_ref, child_inherited.clone())),
                    other => log::warn!("Skipping direct {} in /Kids of {}", other.type_name(), node_ref),
                }
            }
        }

        Ok(pages)
    }

    /// Number of pages reachable from the catalog.
    pub fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages()?.len())
    }
}

/// Check the `%PDF-` header and return the version string.
///
/// The header may be preceded by up to 1 KB of junk.
pub fn parse_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| {
            Error::InvalidHeader(String::from_utf8_lossy(&data[..data.len().min(8)]).into_owned())
        })?;

    let version: String = data[start + 5..]
        .iter()
        .take(8)
        .take_while(|c| c.is_ascii_digit() || **c == b'.')
        .map(|&c| c as char)
        .collect();
    if version.is_empty() {
        return Err(Error::InvalidHeader(
            String::from_utf8_lossy(&data[start..data.len().min(start + 8)]).into_owned(),
        ));
    }
    Ok(version)
}

/// Read the xref chain, falling back to a full scan.
///
/// A scan that fails too surfaces the original error.
fn load_xref(data: &[u8], options: &ParserOptions) -> Result<(CrossRefTable, bool)> {
    let chain = find_xref_offset(data).and_then(|start| load_xref_chain(data, start, options));

    let err = match chain {
        Ok(xref) if xref.trailer().is_some_and(|t| t.contains_key("Root")) => return Ok((xref, false)),
        Ok(_) => Error::CorruptXRef("trailer has no /Root".to_string()),
        Err(e) => e,
    };

    log::warn!("Cross-reference chain unusable ({}), scanning file", err);
    match reconstruct_xref(data, options) {
        Ok(xref) => Ok((xref, true)),
        Err(scan_err) => {
            log::error!("Xref reconstruction failed: {}", scan_err);
            Err(err)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a classic PDF from numbered object bodies.
    fn build_pdf(objects: &[(u32, &str)], trailer: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (id, body) in objects {
            offsets.push((*id, out.len()));
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
        }
        let size = objects.iter().map(|(id, _)| id + 1).max().unwrap_or(1);
        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", size).as_bytes());
        for id in 1..size {
            match offsets.iter().find(|(i, _)| *i == id) {
                Some((_, off)) => out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes()),
                None => out.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }
        out.extend_from_slice(format!("trailer\n{}\nstartxref\n{}\n%%EOF", trailer, xref_start).as_bytes());
        out
    }

    // ============================================================================
    // Header
    // ============================================================================

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header(b"%PDF-1.7\n").unwrap(), "1.7");
        assert_eq!(parse_header(b"junk\n%PDF-2.0\r").unwrap(), "2.0");
        assert!(matches!(parse_header(b"GIF89a"), Err(Error::InvalidHeader(_))));
        assert!(matches!(parse_header(b"%PDF-x"), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(PdfDocument::load(Vec::new()), Err(Error::EmptyInput)));
    }

    // ============================================================================
    // Object loading
    // ============================================================================

    #[test]
    fn test_load_and_resolve() {
        let pdf = build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
                (3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>"),
                (4, "<< /Length 5 0 R >>\nstream\nq Q\nendstream"),
                (5, "3"),
            ],
            "<< /Size 6 /Root 1 0 R >>",
        );
        let mut doc = PdfDocument::load(pdf).unwrap();
        assert_eq!(doc.version(), "1.4");
        assert!(!doc.was_reconstructed());
        assert_eq!(doc.object_count(), 5);

        match doc.get_object(ObjectRef::new(4, 0)).unwrap() {
            Object::Stream { dict, data } => {
                assert_eq!(&data[..], b"q Q");
                assert_eq!(dict["Length"], Object::Integer(3));
            },
            other => panic!("expected stream, got {:?}", other),
        }

        assert_eq!(doc.resolve(&Object::Reference(ObjectRef::new(5, 0))).unwrap(), Object::Integer(3));
        assert_eq!(doc.resolve(&Object::Reference(ObjectRef::new(40, 0))).unwrap(), Object::Null);
        assert!(matches!(doc.get_object(ObjectRef::new(40, 0)), Err(Error::ObjectNotFound(40, 0))));
    }

    #[test]
    fn test_self_referential_length() {
        let pdf = build_pdf(
            &[(1, "<< /Type /Catalog >>"), (2, "<< /Length 2 0 R >>\nstream\nabc\nendstream")],
            "<< /Size 3 /Root 1 0 R >>",
        );
        let mut doc = PdfDocument::load(pdf).unwrap();
        assert!(matches!(doc.get_object(ObjectRef::new(2, 0)), Err(Error::CircularReference(_))));
    }

    // ============================================================================
    // Page tree
    // ============================================================================

    #[test]
    fn test_pages_inherit_attributes() {
        let pdf = build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 612 792] /Resources << /Font << >> >> >>"),
                (3, "<< /Type /Page /Parent 2 0 R >>"),
                (4, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] >>"),
            ],
            "<< /Size 5 /Root 1 0 R >>",
        );
        let mut doc = PdfDocument::load(pdf).unwrap();
        let pages = doc.pages().unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].id, ObjectRef::new(3, 0));
        assert!(pages[0].dict.contains_key("Resources"));
        assert_eq!(
            pages[0].dict["MediaBox"],
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)])
        );
        assert_eq!(
            pages[1].dict["MediaBox"],
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)])
        );
    }

    #[test]
    fn test_kids_cycle_is_corrupt_xref() {
        let pdf = build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
                (3, "<< /Type /Pages /Kids [2 0 R] /Count 1 >>"),
            ],
            "<< /Size 4 /Root 1 0 R >>",
        );
        let mut doc = PdfDocument::load(pdf).unwrap();
        assert!(matches!(doc.pages(), Err(Error::CorruptXRef(_))));
    }

    #[test]
    fn test_zero_pages() {
        let pdf = build_pdf(
            &[(1, "<< /Type /Catalog /Pages 2 0 R >>"), (2, "<< /Type /Pages /Kids [] /Count 0 >>")],
            "<< /Size 3 /Root 1 0 R >>",
        );
        let mut doc = PdfDocument::load(pdf).unwrap();
        assert_eq!(doc.page_count().unwrap(), 0);
    }

    // ============================================================================
    // Xref fallback
    // ============================================================================

    #[test]
    fn test_bad_startxref_falls_back_to_scan() {
        let mut pdf = build_pdf(
            &[(1, "<< /Type /Catalog /Pages 2 0 R >>"), (2, "<< /Type /Pages /Kids [] /Count 0 >>")],
            "<< /Size 3 /Root 1 0 R >>",
        );
        let pos = pdf.windows(9).rposition(|w| w == b"startxref").unwrap();
        pdf.truncate(pos);
        pdf.extend_from_slice(b"startxref\n999999\n%%EOF");

        let mut doc = PdfDocument::load(pdf).unwrap();
        assert!(doc.was_reconstructed());
        assert_eq!(doc.page_count().unwrap(), 0);
    }

    #[test]
    fn test_unrecoverable_xref_surfaces_corrupt_xref() {
        let pdf = b"%PDF-1.4\nnothing here\nstartxref\n999999\n%%EOF".to_vec();
        assert!(matches!(PdfDocument::load(pdf), Err(Error::CorruptXRef(_))));
    }
}
