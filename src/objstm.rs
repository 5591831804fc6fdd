//! Object streams (PDF 1.5+).
//!
//! Object streams (/Type /ObjStm) allow multiple objects to be compressed together
//! in a single stream for better compression ratios. This module parses them on
//! the read side and builds them on the write side.
//!
//! # Format
//!
//! An object stream has this structure:
//! ```text
//! N 0 obj
//! << /Type /ObjStm
//!    /N 5              % Number of objects in stream
//!    /First 30         % Byte offset to first object's data
//!    /Filter /FlateDecode
//! >>
//! stream
//! 10 0 11 15 12 28 13 42 14 55    % Pairs: (obj_num, offset)
//! <dict>                           % Object 10 at offset 0
//! <array>                          % Object 11 at offset 15
//! ...
//! endstream
//! endobj
//! ```
//!
//! The first part contains N pairs of integers (object number, byte offset relative
//! to /First). The second part contains the actual object data.

use crate::decoders::flate_encode;
use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dict, Object};
use crate::parser::parse_object_with;
use crate::parser_config::ParserOptions;
use crate::writer::ObjectSerializer;

/// Parse an object stream and extract all objects.
///
/// Objects are returned in header order, so a compressed xref entry's index
/// is the position in the returned vector. An object that fails to parse is
/// kept as `Null` to preserve those positions.
///
/// The stream's data must already be decrypted.
///
/// # Errors
///
/// Returns an error if:
/// - The object is not a stream
/// - The stream is not a valid object stream (/Type /ObjStm)
/// - Required dictionary entries (/N, /First) are missing
/// - Stream decoding fails
pub fn parse_object_stream(stream_obj: &Object, options: &ParserOptions) -> Result<Vec<(u32, Object)>> {
    let dict = match stream_obj {
        Object::Stream { dict, .. } => dict,
        _ => return Err(Error::InvalidPdf("object stream is not a Stream object".to_string())),
    };

    if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
        if type_name != "ObjStm" {
            return Err(Error::InvalidPdf(format!("expected /Type /ObjStm, got /Type /{}", type_name)));
        }
    }

    let n = dict
        .get("N")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /N entry".to_string()))?;
    let first = dict
        .get("First")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /First entry".to_string()))?;

    if !(0..=1_000_000).contains(&n) {
        return Err(Error::InvalidPdf(format!("invalid object stream /N value: {}", n)));
    }
    if !(0..=10_000_000).contains(&first) {
        return Err(Error::InvalidPdf(format!("invalid object stream /First value: {}", first)));
    }
    let (n, first) = (n as usize, first as usize);

    let decoded = stream_obj.decode_stream_with_options(options)?.into_result()?;
    if decoded.len() < first {
        return Err(Error::InvalidPdf(format!(
            "object stream data too short: {} bytes, expected at least {}",
            decoded.len(),
            first
        )));
    }

    let pairs = parse_object_number_pairs(&decoded[..first], n)?;
    let objects_data = &decoded[first..];

    let objects = pairs
        .into_iter()
        .map(|(obj_num, offset)| {
            let obj = match objects_data.get(offset..) {
                Some(data) => match parse_object_with(data, options) {
                    Ok((_, obj)) => obj,
                    Err(e) => {
                        log::warn!("Failed to parse object {} in object stream: {:?}", obj_num, e);
                        Object::Null
                    },
                },
                None => {
                    log::warn!(
                        "Object {} offset {} is beyond stream data length {}",
                        obj_num,
                        offset,
                        objects_data.len()
                    );
                    Object::Null
                },
            };
            (obj_num, obj)
        })
        .collect();

    Ok(objects)
}

/// Parse the `(object number, offset)` header of an object stream.
fn parse_object_number_pairs(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count.min(4096));
    let mut remaining = data;

    let next_uint = |input: &mut &[u8], what: &str, i: usize| -> Result<u64> {
        match token(*input) {
            Ok((rest, Token::Integer(v))) if v >= 0 => {
                *input = rest;
                Ok(v as u64)
            },
            _ => Err(Error::ParseError {
                offset: data.len() - input.len(),
                reason: format!("failed to parse {} for object stream pair {}", what, i),
            }),
        }
    };

    for i in 0..count {
        let obj_num = next_uint(&mut remaining, "object number", i)?;
        let offset = next_uint(&mut remaining, "offset", i)?;
        pairs.push((obj_num.min(u32::MAX as u64) as u32, offset as usize));
    }

    Ok(pairs)
}

/// Accumulates objects into a single `/Type /ObjStm` stream.
///
/// Stream objects cannot live in an object stream; `add` rejects them.
#[derive(Debug, Default)]
pub struct ObjectStreamBuilder {
    header: Vec<u8>,
    body: Vec<u8>,
    ids: Vec<u32>,
}

impl ObjectStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object, returning its index within the stream.
    pub fn add(&mut self, id: u32, obj: &Object) -> Result<u16> {
        if obj.is_stream() {
            return Err(Error::InvalidPdf(format!("stream object {} cannot be placed in an object stream", id)));
        }
        let index = u16::try_from(self.ids.len())
            .map_err(|_| Error::InvalidPdf("object stream holds too many objects".to_string()))?;

        if !self.header.is_empty() {
            self.header.push(b' ');
        }
        self.header
            .extend_from_slice(format!("{} {}", id, self.body.len()).as_bytes());
        self.body
            .extend_from_slice(&ObjectSerializer::compact().serialize(obj));
        self.body.push(b'\n');
        self.ids.push(id);

        Ok(index)
    }

    /// Number of objects added so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Object numbers in stream order.
    pub fn object_ids(&self) -> &[u32] {
        &self.ids
    }

    /// Build the stream object, Flate-compressed when `compress` is set.
    pub fn build(self, compress: bool) -> Result<Object> {
        let mut data = self.header;
        data.push(b'\n');
        let first = data.len();
        data.extend_from_slice(&self.body);

        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("ObjStm"));
        dict.insert("N".to_string(), Object::Integer(self.ids.len() as i64));
        dict.insert("First".to_string(), Object::Integer(first as i64));

        if compress {
            data = flate_encode(&data)?;
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
        }

        Ok(Object::stream(dict, data))
    }
}
