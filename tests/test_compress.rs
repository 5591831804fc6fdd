//! Integration tests for compress/merge.
//!
//! Covers page order across inputs, resource deduplication, garbage
//! collection, idempotence and the command-line front end.

use pdf_press::api::{compress, compress_with, merge, protect, protect_with};
use pdf_press::config::{EngineConfig, ProtectOptions};
use pdf_press::document::PdfDocument;
use pdf_press::encryption::Algorithm;
use pdf_press::error::Error;
use pdf_press::object::{Dict, Object, ObjectRef};
use pdf_press::writer::{ObjectSerializer, PdfWriter, WriterConfig};
use std::process::Command;
use tempfile::tempdir;

const LOGO: &[u8] = b"\xFF\xD8\xFF\xE0 pretend this is a large JPEG logo \xFF\xD9";

/// One-page document showing `text` and, optionally, the shared logo image.
///
/// `padding` shifts object numbers so identical resources sit at different
/// numbers in different fixtures.
fn fixture(text: &str, with_logo: bool, padding: u32) -> Vec<u8> {
    fixture_with(WriterConfig::classic(), text, with_logo, padding)
}

fn fixture_with(config: WriterConfig, text: &str, with_logo: bool, padding: u32) -> Vec<u8> {
    let mut writer = PdfWriter::new(config);
    for _ in 0..padding {
        writer.add(Object::String(b"unused".to_vec()));
    }

    let content = format!("q 100 0 0 50 0 0 cm /Im0 Do Q BT /F1 12 Tf ({}) Tj ET", text);
    let content = writer.add(Object::stream(Dict::new(), content.into_bytes()));
    let font = writer.add(ObjectSerializer::dict(vec![
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("Type1")),
        ("BaseFont", Object::name("Helvetica")),
    ]));

    let mut xobjects = Dict::new();
    if with_logo {
        let mut image = Dict::new();
        image.insert("Type".to_string(), Object::name("XObject"));
        image.insert("Subtype".to_string(), Object::name("Image"));
        image.insert("Width".to_string(), Object::Integer(1));
        image.insert("Height".to_string(), Object::Integer(1));
        image.insert("Filter".to_string(), Object::name("DCTDecode"));
        let image = writer.add(Object::stream(image, LOGO.to_vec()));
        xobjects.insert("Im0".to_string(), Object::Reference(image));
    }

    let resources = ObjectSerializer::dict(vec![
        ("Font", ObjectSerializer::dict(vec![("F1", Object::Reference(font))])),
        ("XObject", Object::Dictionary(xobjects)),
    ]);

    let pages_id = writer.next_id() + 1;
    let page = writer.add(ObjectSerializer::dict(vec![
        ("Type", Object::name("Page")),
        ("Parent", ObjectSerializer::reference(pages_id, 0)),
        ("Contents", Object::Reference(content)),
        ("Resources", resources),
    ]));
    let pages = writer.add(ObjectSerializer::dict(vec![
        ("Type", Object::name("Pages")),
        ("Kids", Object::Array(vec![Object::Reference(page)])),
        ("Count", Object::Integer(1)),
        ("MediaBox", Object::Array(vec![0, 0, 612, 792].into_iter().map(Object::Integer).collect())),
    ]));
    assert_eq!(pages.id, pages_id);
    let catalog = writer.add(ObjectSerializer::dict(vec![
        ("Type", Object::name("Catalog")),
        ("Pages", Object::Reference(pages)),
    ]));
    writer.set_root(catalog);
    writer.finish().unwrap()
}

fn page_texts(pdf: &[u8]) -> Vec<String> {
    let mut doc = PdfDocument::load(pdf.to_vec()).unwrap();
    doc.pages()
        .unwrap()
        .into_iter()
        .map(|page| {
            let content = doc.resolve(&page.dict["Contents"]).unwrap();
            String::from_utf8(content.decode_stream_data().unwrap()).unwrap()
        })
        .collect()
}

fn count_images(pdf: &[u8]) -> usize {
    let mut doc = PdfDocument::load(pdf.to_vec()).unwrap();
    doc.object_refs()
        .into_iter()
        .filter(|r| {
            doc.get_object(*r)
                .map(|obj| obj.as_dict().and_then(|d| d.get("Subtype")) == Some(&Object::name("Image")))
                .unwrap_or(false)
        })
        .count()
}

mod merging {
    use super::*;

    #[test]
    fn test_pages_concatenated_in_input_order() {
        let a = fixture("first", false, 0);
        let b = fixture("second", false, 3);
        let c = fixture("third", true, 1);

        let out = compress(&[&a, &b, &c]).unwrap();
        let texts = page_texts(&out);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("(first)"));
        assert!(texts[1].contains("(second)"));
        assert!(texts[2].contains("(third)"));
    }

    #[test]
    fn test_merge_alias() {
        let a = fixture("a", true, 0);
        let b = fixture("b", true, 2);
        assert_eq!(merge(&[&a, &b]).unwrap(), compress(&[&a, &b]).unwrap());
    }

    #[test]
    fn test_shared_image_stored_once() {
        let a = fixture("a", true, 0);
        let b = fixture("b", true, 5);
        assert_eq!(count_images(&a) + count_images(&b), 2);

        let (out, stats) = compress_with(&[&a, &b], &EngineConfig::default()).unwrap();
        assert_eq!(count_images(&out), 1);
        // image, font and the resources they hang off
        assert!(stats.duplicates_merged >= 2);

        let mut doc = PdfDocument::load(out).unwrap();
        let pages = doc.pages().unwrap();
        let image_of = |page: &pdf_press::document::Page| {
            page.dict["Resources"].as_dict().unwrap()["XObject"].as_dict().unwrap()["Im0"].clone()
        };
        assert_eq!(image_of(&pages[0]), image_of(&pages[1]));
    }

    #[test]
    fn test_unreferenced_objects_collected() {
        let padded = fixture("x", false, 20);
        let (out, stats) = compress_with(&[&padded], &EngineConfig::default()).unwrap();

        assert_eq!(stats.input_objects, 25);
        // catalog, pages, page, content, font
        assert_eq!(stats.output_objects, 5);
        assert!(out.len() < padded.len());
    }

    /// Two pages; page `from` (0 or 1) carries a link annotation to the other.
    fn linked_pages(from: usize) -> Vec<u8> {
        let page_ids = [3, 4];
        let mut writer = PdfWriter::new(WriterConfig::classic());
        writer.insert(
            ObjectRef::new(1, 0),
            ObjectSerializer::dict(vec![("Type", Object::name("Catalog")), ("Pages", ObjectSerializer::reference(2, 0))]),
        );
        writer.insert(
            ObjectRef::new(2, 0),
            ObjectSerializer::dict(vec![
                ("Type", Object::name("Pages")),
                ("Kids", Object::Array(page_ids.iter().map(|id| ObjectSerializer::reference(*id, 0)).collect())),
                ("Count", Object::Integer(2)),
            ]),
        );
        for (i, id) in page_ids.into_iter().enumerate() {
            let mut entries = vec![
                ("Type", Object::name("Page")),
                ("Parent", ObjectSerializer::reference(2, 0)),
                ("Contents", ObjectSerializer::reference(6 + i as u32, 0)),
            ];
            if i == from {
                entries.push(("Annots", Object::Array(vec![ObjectSerializer::reference(5, 0)])));
            }
            writer.insert(ObjectRef::new(id, 0), ObjectSerializer::dict(entries));
            let text = format!("BT (page {}) Tj ET", i + 1);
            writer.insert(ObjectRef::new(6 + i as u32, 0), Object::stream(Dict::new(), text.into_bytes()));
        }
        writer.insert(
            ObjectRef::new(5, 0),
            ObjectSerializer::dict(vec![
                ("Type", Object::name("Annot")),
                ("Subtype", Object::name("Link")),
                (
                    "Dest",
                    Object::Array(vec![ObjectSerializer::reference(page_ids[1 - from], 0), Object::name("Fit")]),
                ),
            ]),
        );
        writer.set_root(ObjectRef::new(1, 0));
        writer.finish().unwrap()
    }

    fn assert_link_lands_on_page(from: usize) {
        let out = compress(&[&linked_pages(from)]).unwrap();
        assert_eq!(page_texts(&out), vec!["BT (page 1) Tj ET", "BT (page 2) Tj ET"]);

        let mut doc = PdfDocument::load(out).unwrap();
        let pages = doc.pages().unwrap();
        let annots = pages[from].dict["Annots"].as_array().unwrap()[0].clone();
        let link = doc.resolve(&annots).unwrap();
        let dest = link.as_dict().unwrap()["Dest"].as_array().unwrap()[0].clone();
        assert_eq!(dest, Object::Reference(pages[1 - from].id));
    }

    #[test]
    fn test_link_to_later_page() {
        assert_link_lands_on_page(0);
    }

    #[test]
    fn test_link_to_earlier_page() {
        assert_link_lands_on_page(1);
    }

    #[test]
    fn test_zero_page_input() {
        let mut writer = PdfWriter::new(WriterConfig::classic());
        writer.insert(
            ObjectRef::new(1, 0),
            ObjectSerializer::dict(vec![("Type", Object::name("Catalog")), ("Pages", ObjectSerializer::reference(2, 0))]),
        );
        writer.insert(
            ObjectRef::new(2, 0),
            ObjectSerializer::dict(vec![
                ("Type", Object::name("Pages")),
                ("Kids", Object::Array(Vec::new())),
                ("Count", Object::Integer(0)),
            ]),
        );
        writer.set_root(ObjectRef::new(1, 0));
        let empty = writer.finish().unwrap();

        let out = compress(&[&empty]).unwrap();
        let mut doc = PdfDocument::load(out).unwrap();
        assert_eq!(doc.page_count().unwrap(), 0);
    }
}

mod stability {
    use super::*;

    #[test]
    fn test_compress_is_idempotent() {
        let a = fixture("a", true, 0);
        let b = fixture("b", true, 4);

        let once = compress(&[&a, &b]).unwrap();
        let twice = compress(&[&once]).unwrap();

        assert_eq!(page_texts(&once), page_texts(&twice));
        assert_eq!(count_images(&twice), 1);
        assert!(twice.len() <= once.len() + 16);
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = fixture("a", true, 0);
        let b = fixture("b", true, 1);
        assert_eq!(compress(&[&a, &b]).unwrap(), compress(&[&a, &b]).unwrap());
    }

    #[test]
    fn test_content_streams_compressed() {
        let plain = WriterConfig::classic().with_compress_streams(false);
        let a = fixture_with(plain, &"repetitive text ".repeat(200), false, 0);
        let out = compress(&[&a]).unwrap();

        assert!(out.len() < a.len());
        let texts = page_texts(&out);
        assert!(texts[0].contains("repetitive text repetitive text"));
    }

    #[test]
    fn test_unknown_filter_copied_verbatim() {
        let mut writer = PdfWriter::new(WriterConfig::classic());
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::name("JBIG2Decode"));
        let payload = b"\x97JB2\x0D\x0A\x1A\x0A opaque".to_vec();
        let image = writer.add(Object::stream(dict, payload.clone()));
        let page = writer.add(ObjectSerializer::dict(vec![
            ("Type", Object::name("Page")),
            (
                "Resources",
                ObjectSerializer::dict(vec![(
                    "XObject",
                    ObjectSerializer::dict(vec![("Im0", Object::Reference(image))]),
                )]),
            ),
        ]));
        let pages = writer.add(ObjectSerializer::dict(vec![
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(vec![Object::Reference(page)])),
            ("Count", Object::Integer(1)),
        ]));
        let catalog = writer.add(ObjectSerializer::dict(vec![
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(pages)),
        ]));
        writer.set_root(catalog);
        let pdf = writer.finish().unwrap();

        let out = compress(&[&pdf]).unwrap();
        let mut doc = PdfDocument::load(out).unwrap();
        let page = doc.pages().unwrap().remove(0);
        let xobjects = page.dict["Resources"].as_dict().unwrap()["XObject"].clone();
        let image = doc.resolve(&xobjects.as_dict().unwrap()["Im0"]).unwrap();
        match image {
            Object::Stream { dict, data } => {
                assert_eq!(dict["Filter"], Object::name("JBIG2Decode"));
                assert_eq!(&data[..], &payload[..]);
            },
            other => panic!("expected stream, got {:?}", other),
        }
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(compress(&[]), Err(Error::EmptyInput)));
        let a = fixture("a", false, 0);
        assert!(matches!(compress(&[&a, &[]]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_document_too_large() {
        let a = fixture("a", false, 0);
        let config = EngineConfig::new().with_max_document_size(64);
        let err = compress_with(&[&a], &config).unwrap_err();
        assert!(matches!(err, Error::DocumentTooLarge { limit: 64, .. }));
    }

    #[test]
    fn test_encrypted_inputs() {
        let a = fixture("open", false, 0);

        // empty user password opens automatically
        let options = ProtectOptions::new("").with_owner_password("owner").with_algorithm(Algorithm::Rc4_128);
        let open = protect_with(&a, &options, &EngineConfig::default()).unwrap();
        let out = compress(&[&open]).unwrap();
        assert!(page_texts(&out)[0].contains("(open)"));

        let locked = protect(&a, "secret").unwrap();
        assert!(matches!(compress(&[&locked]), Err(Error::WrongPassword)));
    }
}

mod cli {
    use super::*;

    #[test]
    fn test_compress_command_writes_output() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let out = dir.path().join("merged.pdf");
        std::fs::write(&a, fixture("a", true, 0)).unwrap();
        std::fs::write(&b, fixture("b", true, 2)).unwrap();

        let status = Command::new(env!("CARGO_BIN_EXE_pdfpress"))
            .arg("compress")
            .arg("-o")
            .arg(&out)
            .arg(&a)
            .arg(&b)
            .status()
            .unwrap();
        assert!(status.success());

        let merged = std::fs::read(&out).unwrap();
        assert_eq!(page_texts(&merged).len(), 2);
        assert_eq!(count_images(&merged), 1);
    }

    #[test]
    fn test_info_command_prints_json() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, fixture("a", false, 0)).unwrap();

        let output = Command::new(env!("CARGO_BIN_EXE_pdfpress")).arg("info").arg(&input).output().unwrap();
        assert!(output.status.success());

        let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(summary["page_count"], 1);
        assert_eq!(summary["encrypted"], false);
    }

    #[test]
    fn test_usage_errors_exit_with_two() {
        let status = Command::new(env!("CARGO_BIN_EXE_pdfpress")).arg("explode").status().unwrap();
        assert_eq!(status.code(), Some(2));
    }
}
