//! Cross-reference table reconstruction for damaged PDFs.
//!
//! When the xref table is corrupted, missing, or loops, this module rebuilds
//! it by scanning the whole file for `N G obj` markers. Objects that appear
//! more than once keep their last definition, which is what an incremental
//! update would have pointed at.
//!
//! This is a fallback mechanism used only when standard xref parsing fails.

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::parse_object_stream;
use crate::parser::{parse_indirect_object, parse_object_with};
use crate::parser_config::ParserOptions;
use crate::xref::{CrossRefTable, XRefEntry, XRefEntryType};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    /// "N G obj" headers
    static ref RE_OBJ_PATTERN: Regex =
        Regex::new(r"(\d{1,10})[\x00\t\n\x0C\r ]+(\d{1,5})[\x00\t\n\x0C\r ]+obj").unwrap();

    /// "trailer <<" keywords
    static ref RE_TRAILER: Regex = Regex::new(r"trailer[\x00\t\n\x0C\r ]*<<").unwrap();
}

/// How far past an object header to look for an object stream marker.
const OBJSTM_PEEK: usize = 512;

/// Reconstruct the cross-reference table by scanning the entire buffer.
///
/// The returned table carries a trailer: the last parseable `trailer`
/// dictionary or xref stream dictionary naming a `/Root`, or else a minimal
/// one pointing at the first `/Type /Catalog` object found. Objects inside
/// readable object streams are indexed as compressed entries.
///
/// # Errors
///
/// `InvalidPdf` if no objects or no catalog can be found.
pub fn reconstruct_xref(data: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    log::info!("Reconstructing xref table by scanning {} bytes", data.len());

    let mut xref = CrossRefTable::new();
    let mut objstm_offsets = Vec::new();
    let mut xref_stream_offsets = Vec::new();

    for capture in RE_OBJ_PATTERN.captures_iter(data) {
        let (Some(full), Some(num), Some(gen)) = (capture.get(0), capture.get(1), capture.get(2)) else {
            continue;
        };
        let (Some(obj_num), Some(gen_num)) = (parse_num::<u32>(num.as_bytes()), parse_num::<u16>(gen.as_bytes())) else {
            log::debug!("Unparsable object header at offset {}", full.start());
            continue;
        };

        // A real header is followed by the start of an object (or endobj)
        let body = &data[full.end()..];
        if !body.first().is_some_and(|&c| crate::lexer::is_whitespace(c) || crate::lexer::is_delimiter(c)) {
            continue;
        }
        let next = body.iter().copied().find(|&c| !crate::lexer::is_whitespace(c));
        let plausible = matches!(next, Some(b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'-' | b'+' | b'.' | b'e'))
            || next.is_some_and(|c| c.is_ascii_digit());
        if !plausible {
            log::debug!("Skipping false positive object header at offset {}", full.start());
            continue;
        }

        let offset = full.start();
        xref.add_entry(obj_num, XRefEntry::uncompressed(offset as u64, gen_num));

        let peek = &body[..body.len().min(OBJSTM_PEEK)];
        if contains(peek, b"/ObjStm") {
            objstm_offsets.push(offset);
        } else if contains(peek, b"/XRef") {
            xref_stream_offsets.push(offset);
        }
    }

    if xref.is_empty() {
        return Err(Error::InvalidPdf("No objects found during xref reconstruction".to_string()));
    }
    log::info!("Reconstructed xref with {} objects", xref.len());

    index_object_streams(data, &mut xref, &objstm_offsets, options);

    let trailer = match find_trailer(data, &xref_stream_offsets, options) {
        Some(trailer) => trailer,
        None => reconstruct_minimal_trailer(data, &xref, options)?,
    };
    xref.set_trailer(trailer);

    Ok(xref)
}

/// Add compressed entries for objects held in object streams.
///
/// Streams that cannot be read (for example, encrypted ones) are skipped.
fn index_object_streams(data: &[u8], xref: &mut CrossRefTable, offsets: &[usize], options: &ParserOptions) {
    for &offset in offsets {
        let Ok((_, (stream_ref, stream))) = parse_indirect_object(&data[offset..], options) else {
            continue;
        };
        match parse_object_stream(&stream, options) {
            Ok(members) => {
                for (index, (obj_num, _)) in members.iter().enumerate() {
                    let has_direct = xref
                        .get(*obj_num)
                        .is_some_and(|e| e.entry_type == XRefEntryType::Uncompressed);
                    if !has_direct {
                        xref.add_entry(*obj_num, XRefEntry::compressed(stream_ref.id as u64, index as u16));
                    }
                }
            },
            Err(e) => log::debug!("Object stream {} not indexed: {}", stream_ref, e),
        }
    }
}

/// Find the newest trailer-like dictionary that names a `/Root`.
fn find_trailer(data: &[u8], xref_stream_offsets: &[usize], options: &ParserOptions) -> Option<Dict> {
    let mut candidates: Vec<(usize, Dict)> = Vec::new();

    for mat in RE_TRAILER.find_iter(data) {
        let dict_start = mat.end() - 2;
        if let Ok((_, Object::Dictionary(dict))) = parse_object_with(&data[dict_start..], options) {
            candidates.push((mat.start(), dict));
        }
    }

    for &offset in xref_stream_offsets {
        if let Ok((_, (_, Object::Stream { dict, .. }))) = parse_indirect_object(&data[offset..], options) {
            if dict.get("Type").and_then(Object::as_name) == Some("XRef") {
                candidates.push((offset, dict));
            }
        }
    }

    candidates.sort_by_key(|(pos, _)| *pos);
    candidates
        .into_iter()
        .rev()
        .map(|(_, dict)| dict)
        .find(|dict| dict.contains_key("Root"))
        .map(|mut dict| {
            // Chain pointers refer to the damaged xref
            for key in ["Prev", "XRefStm", "W", "Index", "Filter", "DecodeParms", "Length", "Type"] {
                dict.remove(key);
            }
            dict
        })
}

/// Build a trailer whose `/Root` is the first catalog object in the file.
fn reconstruct_minimal_trailer(data: &[u8], xref: &CrossRefTable, options: &ParserOptions) -> Result<Dict> {
    log::info!("Reconstructing minimal trailer dictionary");

    let mut uncompressed: Vec<(u32, &XRefEntry)> = xref
        .entries
        .iter()
        .filter(|(_, e)| e.entry_type == XRefEntryType::Uncompressed)
        .map(|(n, e)| (*n, e))
        .collect();
    uncompressed.sort_by_key(|(_, e)| e.offset);

    let catalog = uncompressed.into_iter().find_map(|(obj_num, entry)| {
        let (_, (_, obj)) = parse_indirect_object(&data[entry.offset as usize..], options).ok()?;
        is_catalog(&obj).then_some(ObjectRef::new(obj_num, entry.generation))
    });

    let catalog = catalog.ok_or_else(|| Error::InvalidPdf("Could not find catalog in reconstructed xref".to_string()))?;
    log::info!("Found catalog: {}", catalog);

    let mut trailer = Dict::new();
    trailer.insert("Root".to_string(), Object::Reference(catalog));
    let size = xref.all_object_numbers().max().map_or(1, |n| n as i64 + 1);
    trailer.insert("Size".to_string(), Object::Integer(size));
    Ok(trailer)
}

/// Check if an object is the document catalog.
fn is_catalog(obj: &Object) -> bool {
    obj.dict_type() == Some("Catalog")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn parse_num<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}
