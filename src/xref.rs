//! Cross-reference table parser.
//!
//! The xref table maps object numbers to byte offsets in the PDF file,
//! enabling random access to PDF objects without parsing the whole body.
//!
//! Supports traditional xref tables (PDF 1.0-1.4), cross-reference streams
//! (PDF 1.5+), hybrid files whose trailer carries `/XRefStm`, and chains of
//! incremental updates linked by `/Prev`. Every section offset is visited at
//! most once; a chain that loops back, or an offset outside the file, is
//! reported as [`Error::CorruptXRef`] so the caller can fall back to a scan.

use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use crate::parser::{parse_indirect_object, parse_object_with};
use crate::parser_config::ParserOptions;
use byteorder::{BigEndian, ByteOrder};
use std::collections::{HashMap, HashSet};

/// Upper bound on sections in one `/Prev` chain.
const MAX_XREF_SECTIONS: usize = 1024;

/// Upper bound on a single traditional subsection's entry count.
const MAX_SUBSECTION_ENTRIES: u32 = 8_388_607;

/// Cross-reference table entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntryType {
    /// Entry for a free object
    Free,
    /// Entry for an uncompressed object (traditional)
    Uncompressed,
    /// Entry for an object in an object stream (PDF 1.5+)
    Compressed,
}

/// Cross-reference table entry.
///
/// Supports both traditional entries (byte offset) and compressed entries
/// (object stream reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Type of entry
    pub entry_type: XRefEntryType,
    /// Byte offset (for uncompressed) or object stream number (for compressed)
    pub offset: u64,
    /// Generation number (for uncompressed) or index within stream (for compressed)
    pub generation: u16,
    /// Whether the object is in use
    pub in_use: bool,
}

impl XRefEntry {
    /// Create a new cross-reference entry (traditional format).
    pub fn new(offset: u64, generation: u16, in_use: bool) -> Self {
        if in_use {
            Self::uncompressed(offset, generation)
        } else {
            Self::free(offset, generation)
        }
    }

    /// Create a new uncompressed entry.
    pub fn uncompressed(offset: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Uncompressed,
            offset,
            generation,
            in_use: true,
        }
    }

    /// Create a new compressed entry (object in object stream).
    pub fn compressed(stream_obj_num: u64, index_in_stream: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Compressed,
            offset: stream_obj_num,
            generation: index_in_stream,
            in_use: true,
        }
    }

    /// Create a new free entry.
    pub fn free(next_free: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Free,
            offset: next_free,
            generation,
            in_use: false,
        }
    }
}

/// Cross-reference table that maps object numbers to their locations.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    pub(crate) entries: HashMap<u32, XRefEntry>,
    /// Trailer dictionary (for xref streams, this is the stream dictionary)
    trailer: Option<Dict>,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dict) {
        self.trailer = Some(trailer);
    }

    /// Get the trailer dictionary if present.
    pub fn trailer(&self) -> Option<&Dict> {
        self.trailer.as_ref()
    }

    /// Add an entry to the cross-reference table.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Check if an object exists in the xref table.
    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    /// Get all object numbers in the table.
    pub fn all_object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Merge entries from an older section.
    ///
    /// Entries already in self win (newer incremental updates override
    /// older ones). The trailer is taken from `other` only if self has none.
    pub fn merge_from(&mut self, other: CrossRefTable) {
        for (obj_num, entry) in other.entries {
            self.entries.entry(obj_num).or_insert(entry);
        }

        if self.trailer.is_none() {
            self.trailer = other.trailer;
        }
    }

    /// Get the number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the byte offset of the newest xref section.
///
/// Searches the last 2 KB of the file for the final `startxref` keyword and
/// reads the offset after it.
///
/// # Errors
///
/// `CorruptXRef` if the keyword is missing, the offset does not parse, or the
/// offset lies outside the file.
pub fn find_xref_offset(data: &[u8]) -> Result<usize> {
    let tail_start = data.len().saturating_sub(2048);
    let tail = &data[tail_start..];

    let keyword = b"startxref";
    let pos = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::CorruptXRef("startxref not found".to_string()))?;

    let after = &tail[pos + keyword.len()..];
    let digits: Vec<u8> = after
        .iter()
        .copied()
        .skip_while(|&c| crate::lexer::is_whitespace(c))
        .take_while(u8::is_ascii_digit)
        .collect();

    let offset: usize = std::str::from_utf8(&digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::CorruptXRef("startxref offset is not a number".to_string()))?;

    if offset >= data.len() {
        return Err(Error::CorruptXRef(format!(
            "startxref offset {} is beyond end of file ({} bytes)",
            offset,
            data.len()
        )));
    }

    Ok(offset)
}

/// Load the full xref chain starting at `start`.
///
/// Follows `/XRefStm` (hybrid files) and `/Prev` (incremental updates),
/// newest section first. Visiting an offset twice is a loop.
pub fn load_xref_chain(data: &[u8], start: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let mut visited = HashSet::new();
    let mut xref = CrossRefTable::new();
    let mut next = Some(start);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            return Err(Error::CorruptXRef(format!("/Prev chain loops back to offset {}", offset)));
        }
        if visited.len() > MAX_XREF_SECTIONS {
            return Err(Error::CorruptXRef(format!(
                "more than {} xref sections",
                MAX_XREF_SECTIONS
            )));
        }

        let section = parse_xref_section(data, offset, options)?;
        let trailer = section.trailer().cloned().unwrap_or_default();
        xref.merge_from(section);

        if let Some(stm) = trailer.get("XRefStm").and_then(Object::as_integer) {
            let stm = stm as usize;
            if visited.insert(stm) {
                match parse_xref_stream(data, stm, options) {
                    Ok(hybrid) => {
                        log::debug!("Merged {} entries from /XRefStm at {}", hybrid.len(), stm);
                        xref.merge_from(hybrid);
                    },
                    Err(e) => log::warn!("Ignoring unreadable /XRefStm at {}: {}", stm, e),
                }
            }
        }

        next = match trailer.get("Prev").and_then(Object::as_integer) {
            Some(prev) if prev >= 0 => Some(prev as usize),
            Some(prev) => {
                return Err(Error::CorruptXRef(format!("negative /Prev offset {}", prev)));
            },
            None => None,
        };
    }

    Ok(xref)
}

/// Parse one xref section (table or stream) at `offset`.
pub fn parse_xref_section(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    if offset >= data.len() {
        return Err(Error::CorruptXRef(format!(
            "xref offset {} is beyond end of file ({} bytes)",
            offset,
            data.len()
        )));
    }

    let body = &data[offset..];
    let start = body
        .iter()
        .position(|&c| !crate::lexer::is_whitespace(c))
        .unwrap_or(body.len());
    let body = &body[start..];

    log::debug!("Parsing xref at offset {}", offset);

    if body.starts_with(b"xref") {
        parse_traditional_xref(data, offset + start, options)
    } else if body.first().is_some_and(u8::is_ascii_digit) {
        parse_xref_stream(data, offset + start, options)
    } else {
        Err(Error::CorruptXRef(format!("no xref table or stream at offset {}", offset)))
    }
}

/// Parse a traditional cross-reference table and the trailer after it.
///
/// The xref table format is:
/// ```text
/// xref
/// 0 6             % Start at object 0, 6 entries
/// 0000000000 65535 f
/// 0000000018 00000 n
/// ...
/// trailer
/// << /Size 6 /Root 1 0 R >>
/// ```
///
/// Malformed entry lines become free entries so numbering stays aligned.
fn parse_traditional_xref(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let mut xref = CrossRefTable::new();
    let mut lines = LineIter::new(data, offset);

    // "xref" keyword line; some writers put the first subsection on the same line
    let first = lines
        .next()
        .ok_or_else(|| Error::CorruptXRef("empty xref section".to_string()))?;
    let mut pending: Option<&[u8]> = first.1.strip_prefix(b"xref").map(trim_bytes).filter(|l| !l.is_empty());

    let mut trailer_pos = None;

    loop {
        let (pos, line) = match pending.take() {
            Some(l) => (0, l),
            None => match lines.next() {
                Some((p, l)) => (p, trim_bytes(l)),
                None => break,
            },
        };

        if line.starts_with(b"trailer") {
            trailer_pos = Some(pos + b"trailer".len());
            break;
        }
        if line.is_empty() || line.starts_with(b"%") {
            continue;
        }

        let parts: Vec<&[u8]> = fields(line);
        if parts.len() != 2 {
            log::warn!("Skipping malformed xref subsection header {:?}", String::from_utf8_lossy(line));
            continue;
        }
        let (start_obj, count) = match (parse_num::<u32>(parts[0]), parse_num::<u32>(parts[1])) {
            (Some(s), Some(c)) => (s, c),
            _ => return Err(Error::CorruptXRef("unreadable xref subsection header".to_string())),
        };
        if count > MAX_SUBSECTION_ENTRIES {
            return Err(Error::CorruptXRef(format!("xref subsection count {} exceeds limit", count)));
        }

        let mut i = 0;
        while i < count {
            let (entry_pos, raw) = match lines.next() {
                Some(l) => l,
                None => break,
            };
            let entry_line = trim_bytes(raw);
            if entry_line.is_empty() {
                continue;
            }
            if entry_line.starts_with(b"trailer") {
                log::warn!("Expected {} entries but only found {} before trailer", count, i);
                trailer_pos = Some(entry_pos + (raw.len() - raw.trim_ascii_start().len()) + b"trailer".len());
                break;
            }

            let parts = fields(entry_line);
            let entry = match parts.as_slice() {
                [off, gen, flag, ..] => match (parse_num::<u64>(off), parse_num::<u16>(gen)) {
                    (Some(off), Some(gen)) => {
                        XRefEntry::new(off, gen, flag.first().map(u8::to_ascii_lowercase) == Some(b'n'))
                    },
                    _ => {
                        log::warn!("Malformed xref entry for object {}", start_obj + i);
                        XRefEntry::free(0, 65535)
                    },
                },
                _ => {
                    log::warn!("Malformed xref entry (too few parts) for object {}", start_obj + i);
                    XRefEntry::free(0, 65535)
                },
            };
            xref.add_entry(start_obj.saturating_add(i), entry);
            i += 1;
        }

        if trailer_pos.is_some() {
            break;
        }
    }

    let trailer_pos = trailer_pos.ok_or_else(|| Error::CorruptXRef("xref table has no trailer".to_string()))?;
    let (_, trailer) = parse_object_with(&data[trailer_pos..], options).map_err(|_| {
        Error::CorruptXRef(format!("unreadable trailer dictionary at offset {}", trailer_pos))
    })?;
    match trailer {
        Object::Dictionary(dict) => xref.set_trailer(dict),
        other => {
            return Err(Error::CorruptXRef(format!("trailer is a {}, not a dictionary", other.type_name())));
        },
    }

    Ok(xref)
}

/// Parse a cross-reference stream (PDF 1.5+).
///
/// The stream dictionary contains:
/// - `/W [w1 w2 w3]` - Field widths in bytes
/// - `/Size` - Total number of entries
/// - `/Index [start1 count1 start2 count2...]` - Optional subsection ranges
///
/// Each entry consists of 3 big-endian fields:
/// - Field 1: Entry type (0=free, 1=uncompressed, 2=compressed), default 1
/// - Field 2: Offset (type 1) or stream object number (type 2)
/// - Field 3: Generation (type 1) or index within stream (type 2), default 0
pub fn parse_xref_stream(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::CorruptXRef(format!("xref stream offset {} out of bounds", offset)))?;

    let (_, (_, obj)) = parse_indirect_object(input, options)
        .map_err(|_| Error::CorruptXRef(format!("no xref stream object at offset {}", offset)))?;

    let dict = match &obj {
        Object::Stream { dict, .. } => dict.clone(),
        other => {
            return Err(Error::CorruptXRef(format!(
                "object at xref offset {} is a {}, not a stream",
                offset,
                other.type_name()
            )));
        },
    };

    if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
        if type_name != "XRef" {
            return Err(Error::CorruptXRef(format!("expected /Type /XRef, got /Type /{}", type_name)));
        }
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .map(|arr| arr.iter().filter_map(Object::as_integer).map(|w| w.max(0) as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(Error::CorruptXRef(format!("invalid /W array {:?} in xref stream", widths)));
    }
    let (w1, w2, w3) = (widths[0], widths[1], widths[2]);
    let entry_size = w1 + w2 + w3;
    if entry_size == 0 {
        return Err(Error::CorruptXRef("xref stream /W widths are all zero".to_string()));
    }

    let size = dict.get("Size").and_then(Object::as_integer).unwrap_or(0).max(0) as u32;

    let index_ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(Object::as_array) {
        Some(index) => index
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_integer()? as u32, pair[1].as_integer()? as u32)))
            .collect(),
        None => vec![(0, size)],
    };

    let decoded = obj
        .decode_stream_with_options(options)?
        .into_result()
        .map_err(|e| Error::CorruptXRef(format!("cannot decode xref stream: {}", e)))?;

    let mut xref = CrossRefTable::new();
    let mut entries = decoded.chunks_exact(entry_size);

    'ranges: for (start_obj, count) in index_ranges {
        for i in 0..count {
            let entry_data = match entries.next() {
                Some(e) => e,
                None => {
                    log::warn!("Xref stream data ends early at object {}", start_obj + i);
                    break 'ranges;
                },
            };

            let entry_type = if w1 > 0 { read_int(&entry_data[..w1]) } else { 1 };
            let field2 = read_int(&entry_data[w1..w1 + w2]);
            let field3 = read_int(&entry_data[w1 + w2..]);

            let entry = match entry_type {
                0 => XRefEntry::free(field2, field3 as u16),
                1 => XRefEntry::uncompressed(field2, field3 as u16),
                2 => XRefEntry::compressed(field2, field3 as u16),
                other => {
                    // Unknown types are references to the null object
                    log::debug!("Xref stream entry type {} for object {}", other, start_obj + i);
                    continue;
                },
            };
            xref.add_entry(start_obj.saturating_add(i), entry);
        }
    }

    xref.set_trailer(dict);
    Ok(xref)
}

/// Read a big-endian integer of 0-8 bytes.
fn read_int(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        0
    } else {
        BigEndian::read_uint(bytes, bytes.len())
    }
}

fn trim_bytes(line: &[u8]) -> &[u8] {
    line.trim_ascii()
}

fn fields(line: &[u8]) -> Vec<&[u8]> {
    line.split(|&c| crate::lexer::is_whitespace(c))
        .filter(|f| !f.is_empty())
        .collect()
}

fn parse_num<T: std::str::FromStr>(field: &[u8]) -> Option<T> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

/// Iterator over lines starting at an offset, yielding `(absolute_offset, line)`.
///
/// Handles all PDF line ending styles (LF, CRLF, CR).
pub(crate) struct LineIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LineIter<'a> {
    pub(crate) fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }
}

impl<'a> Iterator for LineIter<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }

        let start = self.pos;
        let rest = &self.data[start..];
        let len = rest.iter().position(|&c| c == b'\r' || c == b'\n').unwrap_or(rest.len());

        self.pos = start + len;
        if self.data.get(self.pos) == Some(&b'\r') {
            self.pos += 1;
        }
        if self.data.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }

        Some((start, &rest[..len]))
    }
}
