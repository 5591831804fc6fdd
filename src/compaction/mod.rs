//! Multi-document compaction.
//!
//! Pages of every input are walked in order, all objects they reach are
//! content-hashed, and objects with equal hashes collapse into one
//! renumbered object. Only reachable objects are written, under a fresh
//! catalog and a flat page tree.
//!
//! Object numbering of the output:
//!
//! | Number | Object |
//! |---|---|
//! | 1 | Catalog |
//! | 2 | Page tree root |
//! | 3.. | Unique objects in first-seen order |

mod graph;
mod hashing;

pub use graph::{Node, NodeKey, ObjectGraph};
pub use hashing::{deep_hashes, shallow_digests, Hash};

use crate::document::PdfDocument;
use crate::error::Result;
use crate::object::{Object, ObjectRef};
use crate::writer::{ObjectSerializer, PdfWriter, WriterConfig};
use indexmap::IndexMap;
use serde::Serialize;

const CATALOG_ID: u32 = 1;
const PAGES_ID: u32 = 2;

/// Counters reported by a compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactionStats {
    /// Objects listed by the input cross-reference tables
    pub input_objects: usize,
    /// Objects reachable from the input pages
    pub reachable_objects: usize,
    /// Indirect objects written, catalog and page tree included
    pub output_objects: usize,
    /// Reachable objects folded into an earlier identical one
    pub duplicates_merged: usize,
    /// Pages in the output
    pub pages: usize,
}

/// Merge, deduplicate and rewrite `documents` into one PDF.
///
/// # Errors
///
/// Fails if any input cannot be walked (see [`ObjectGraph::collect`]) or
/// the output cannot be serialized.
pub fn compact(documents: &mut [PdfDocument], config: &WriterConfig) -> Result<(Vec<u8>, CompactionStats)> {
    let input_objects = documents.iter().map(PdfDocument::object_count).sum();

    let graph = ObjectGraph::collect(documents)?;
    let shallow = shallow_digests(&graph);
    let hashes = deep_hashes(&graph, &shallow);

    // Hash -> output number, in first-seen order
    let mut unique: IndexMap<Hash, u32> = IndexMap::new();
    let mut representative: Vec<usize> = Vec::new();
    let mut numbering: Vec<u32> = Vec::with_capacity(graph.len());
    for (idx, hash) in hashes.iter().enumerate() {
        let next = PAGES_ID + 1 + unique.len() as u32;
        let number = *unique.entry(*hash).or_insert_with(|| {
            representative.push(idx);
            next
        });
        numbering.push(number);
    }

    let mut writer = PdfWriter::new(config.clone());
    for &idx in &representative {
        let node = &graph.nodes[idx];
        let mut object = node.object.clone();
        let doc = node.key.0;
        object.remap_references(&mut |r| match graph.lookup(&(doc, r)) {
            Some(target) => Object::Reference(ObjectRef::new(numbering[target], 0)),
            None => Object::Null,
        });
        if node.is_page {
            if let Some(dict) = object.as_dict_mut() {
                dict.insert("Parent".to_string(), ObjectSerializer::reference(PAGES_ID, 0));
            }
        }
        writer.insert(ObjectRef::new(numbering[idx], 0), object);
    }

    let kids: Vec<Object> = graph
        .pages
        .iter()
        .map(|&idx| ObjectSerializer::reference(numbering[idx], 0))
        .collect();
    let page_count = kids.len();

    writer.insert(
        ObjectRef::new(PAGES_ID, 0),
        ObjectSerializer::dict(vec![
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(page_count as i64)),
        ]),
    );
    writer.insert(
        ObjectRef::new(CATALOG_ID, 0),
        ObjectSerializer::dict(vec![
            ("Type", Object::name("Catalog")),
            ("Pages", ObjectSerializer::reference(PAGES_ID, 0)),
        ]),
    );
    writer.set_root(ObjectRef::new(CATALOG_ID, 0));

    let stats = CompactionStats {
        input_objects,
        reachable_objects: graph.len(),
        output_objects: writer.len(),
        duplicates_merged: graph.len() - representative.len(),
        pages: page_count,
    };
    log::info!(
        "Compacted {} documents: {} pages, {} of {} objects kept, {} duplicates merged",
        documents.len(),
        stats.pages,
        stats.output_objects,
        stats.input_objects,
        stats.duplicates_merged
    );

    Ok((writer.finish()?, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal one-page document whose page draws `content` with font `font`.
    fn page_pdf(content: &[u8], font: &str) -> Vec<u8> {
        let objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                String::from_utf8_lossy(content)
            ),
            format!("<< /Type /Font /Subtype /Type1 /BaseFont /{} >>", font),
        ];
        build_pdf(&objects)
    }

    fn build_pdf(objects: &[String]) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).into_bytes());
        }
        let xref = out.len();
        out.extend(format!("xref\n0 {}\n0000000000 65535 f\r\n", objects.len() + 1).into_bytes());
        for off in offsets {
            out.extend(format!("{:010} 00000 n\r\n", off).into_bytes());
        }
        out.extend(
            format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF", objects.len() + 1, xref).into_bytes(),
        );
        out
    }

    // ========================================================================
    // Merging
    // ========================================================================

    #[test]
    fn test_shared_font_merged_across_documents() {
        let mut docs = vec![
            PdfDocument::load(page_pdf(b"BT /F1 12 Tf (a) Tj ET", "Helvetica")).unwrap(),
            PdfDocument::load(page_pdf(b"BT /F1 12 Tf (b) Tj ET", "Helvetica")).unwrap(),
        ];
        let (bytes, stats) = compact(&mut docs, &WriterConfig::default()).unwrap();

        assert_eq!(stats.pages, 2);
        assert_eq!(stats.reachable_objects, 6);
        assert_eq!(stats.duplicates_merged, 1);
        // catalog, pages, 2 pages, 2 contents, 1 font
        assert_eq!(stats.output_objects, 7);

        let mut out = PdfDocument::load(bytes).unwrap();
        assert_eq!(out.page_count().unwrap(), 2);
    }

    #[test]
    fn test_identical_pages_stay_distinct() {
        let pdf = page_pdf(b"BT ET", "Courier");
        let mut docs = vec![PdfDocument::load(pdf.clone()).unwrap(), PdfDocument::load(pdf).unwrap()];
        let (bytes, stats) = compact(&mut docs, &WriterConfig::default()).unwrap();

        // content and font merge, pages do not
        assert_eq!(stats.duplicates_merged, 2);
        let mut out = PdfDocument::load(bytes).unwrap();
        let pages = out.pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert_ne!(pages[0].id, pages[1].id);
        assert_eq!(pages[0].dict["Contents"], pages[1].dict["Contents"]);
    }

    #[test]
    fn test_inherited_media_box_materialized() {
        let mut docs = vec![PdfDocument::load(page_pdf(b"BT ET", "Courier")).unwrap()];
        let (bytes, _) = compact(&mut docs, &WriterConfig::default()).unwrap();

        let mut out = PdfDocument::load(bytes).unwrap();
        let page = out.pages().unwrap().remove(0);
        assert_eq!(page.dict["Parent"], ObjectSerializer::reference(PAGES_ID, 0));
        assert!(page.dict.contains_key("MediaBox"));
    }

    #[test]
    fn test_zero_pages_yields_empty_document() {
        let pdf = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [] /Count 0 >>".to_string(),
        ]);
        let mut docs = vec![PdfDocument::load(pdf).unwrap()];
        let (bytes, stats) = compact(&mut docs, &WriterConfig::default()).unwrap();

        assert_eq!(stats.pages, 0);
        assert_eq!(stats.output_objects, 2);
        let mut out = PdfDocument::load(bytes).unwrap();
        assert_eq!(out.page_count().unwrap(), 0);
    }

    // ========================================================================
    // Garbage collection and cycles
    // ========================================================================

    #[test]
    fn test_unreachable_objects_dropped() {
        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 10 10] >>".to_string(),
        ];
        objects.push("(orphan)".to_string());
        let mut docs = vec![PdfDocument::load(build_pdf(&objects)).unwrap()];
        let (_, stats) = compact(&mut docs, &WriterConfig::default()).unwrap();

        assert_eq!(stats.input_objects, 4);
        assert_eq!(stats.output_objects, 3);
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /Annots [4 0 R] >>".to_string(),
            "<< /Next 5 0 R /Back 2 0 R >>".to_string(),
            "<< /Next 4 0 R >>".to_string(),
        ];
        let mut docs = vec![PdfDocument::load(build_pdf(&objects)).unwrap()];
        let (bytes, stats) = compact(&mut docs, &WriterConfig::default()).unwrap();

        assert_eq!(stats.output_objects, 5);
        let mut out = PdfDocument::load(bytes).unwrap();
        let page = out.pages().unwrap().remove(0);
        let annot = out
            .resolve(&page.dict["Annots"].as_array().unwrap()[0])
            .unwrap();
        // the back-reference into the old page tree reads as null
        assert_eq!(annot.as_dict().unwrap()["Back"], Object::Null);
    }

    #[test]
    fn test_output_is_deterministic() {
        let run = || {
            let mut docs = vec![
                PdfDocument::load(page_pdf(b"BT ET", "Courier")).unwrap(),
                PdfDocument::load(page_pdf(b"BT ET", "Symbol")).unwrap(),
            ];
            compact(&mut docs, &WriterConfig::default()).unwrap().0
        };
        assert_eq!(run(), run());
    }
}
