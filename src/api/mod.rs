//! Boundary operations on serialized PDFs.
//!
//! Every operation takes whole documents as byte buffers and returns a
//! complete, independently valid PDF. Each call owns its documents, writer
//! and encryption state; nothing is shared between calls.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_press::api;
//!
//! let merged = api::compress(&[&first, &second])?;
//! let locked = api::protect(&merged, "secret")?;
//! let opened = api::decrypt(&locked, "secret")?;
//! ```
//!
//! ## Choosing an algorithm
//!
//! ```ignore
//! use pdf_press::api;
//! use pdf_press::config::{EngineConfig, ProtectOptions};
//! use pdf_press::encryption::{Algorithm, Permissions};
//!
//! let options = ProtectOptions::new("user")
//!     .with_owner_password("owner")
//!     .with_algorithm(Algorithm::Aes256)
//!     .with_permissions(Permissions::PRINT | Permissions::COPY);
//! let locked = api::protect_with(&pdf, &options, &EngineConfig::default())?;
//! ```

use crate::compaction::{self, CompactionStats};
use crate::config::{EngineConfig, ProtectOptions};
use crate::document::PdfDocument;
use crate::encryption::{algorithms, Algorithm, EncryptionWriteHandler};
use crate::error::{Error, Result};
use crate::object::Object;
use crate::writer::PdfWriter;
use serde::Serialize;

/// Summary of a document for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    /// Header version
    pub version: String,
    /// Number of pages
    pub page_count: usize,
    /// Number of live indirect objects
    pub object_count: usize,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// Encryption algorithm, if encrypted
    pub algorithm: Option<Algorithm>,
    /// Whether the cross-reference data had to be rebuilt
    pub reconstructed: bool,
}

/// Merge `documents` in order into one deduplicated PDF.
///
/// # Errors
///
/// `EmptyInput` for an empty list or an empty buffer, `DocumentTooLarge`
/// above the configured limit, and any load or compaction error.
pub fn compress(documents: &[&[u8]]) -> Result<Vec<u8>> {
    compress_with(documents, &EngineConfig::default()).map(|(bytes, _)| bytes)
}

/// Same as [`compress`].
pub fn merge(documents: &[&[u8]]) -> Result<Vec<u8>> {
    compress(documents)
}

/// [`compress`] with explicit configuration, also returning statistics.
pub fn compress_with(documents: &[&[u8]], config: &EngineConfig) -> Result<(Vec<u8>, CompactionStats)> {
    if documents.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut loaded = documents
        .iter()
        .map(|data| {
            config.check_input(data)?;
            PdfDocument::load_with(data.to_vec(), &config.parser, None)
        })
        .collect::<Result<Vec<_>>>()?;

    compaction::compact(&mut loaded, &config.writer)
}

/// Encrypt `document` with AES-128, `password` opening it with full access.
///
/// The empty password is accepted.
pub fn protect(document: &[u8], password: &str) -> Result<Vec<u8>> {
    protect_with(document, &ProtectOptions::new(password), &EngineConfig::default())
}

/// Encrypt `document` as described by `options`.
///
/// An input that is already encrypted must open with the empty password; its
/// old encryption is replaced.
///
/// # Errors
///
/// - `InvalidPermissions` for reserved permission bits
/// - `UnsupportedRevision` for a revision the algorithm is not written with
/// - `WrongPassword` for an encrypted input that does not open
pub fn protect_with(document: &[u8], options: &ProtectOptions, config: &EngineConfig) -> Result<Vec<u8>> {
    config.check_input(document)?;
    let mut doc = PdfDocument::load_with(document.to_vec(), &config.parser, None)?;
    if !doc.is_authenticated() {
        return Err(Error::WrongPassword);
    }

    let file_id = doc.file_id().unwrap_or_else(|| algorithms::random_bytes(16));
    let (encrypt_dict, handler) = EncryptionWriteHandler::new(options, &file_id)?;

    let mut writer = rewrite(&mut doc, config)?;
    writer.set_file_id(file_id);
    writer.set_encryption(encrypt_dict, handler);
    writer.finish()
}

/// Remove encryption from `document`, opening it with `password`.
///
/// Either the user or the owner password is accepted. An unencrypted input
/// is rewritten unchanged in content.
///
/// # Errors
///
/// `WrongPassword` when `password` opens neither way.
pub fn decrypt(document: &[u8], password: &str) -> Result<Vec<u8>> {
    decrypt_with(document, password, &EngineConfig::default())
}

/// [`decrypt`] with explicit configuration.
pub fn decrypt_with(document: &[u8], password: &str, config: &EngineConfig) -> Result<Vec<u8>> {
    config.check_input(document)?;
    let mut doc = PdfDocument::load_with(document.to_vec(), &config.parser, Some(password))?;
    if let Some(algorithm) = doc.encryption_algorithm() {
        log::info!("Removing {} encryption", algorithm);
    }

    let mut writer = rewrite(&mut doc, config)?;
    if let Some(id) = doc.file_id() {
        writer.set_file_id(id);
    }
    writer.finish()
}

/// Describe `document` without modifying it.
///
/// Page count is reported as zero for an encrypted document that does not
/// open with the empty password.
pub fn inspect(document: &[u8]) -> Result<DocumentSummary> {
    let config = EngineConfig::default();
    config.check_input(document)?;
    let mut doc = PdfDocument::load_with(document.to_vec(), &config.parser, None)?;

    let page_count = if doc.is_authenticated() { doc.page_count()? } else { 0 };
    Ok(DocumentSummary {
        version: doc.version().to_string(),
        page_count,
        object_count: doc.object_count(),
        encrypted: doc.is_encrypted(),
        algorithm: doc.encryption_algorithm(),
        reconstructed: doc.was_reconstructed(),
    })
}

/// Copy every live object of `doc`, decrypted, under its own number.
///
/// Cross-reference streams, object streams and the old encryption
/// dictionary are left out; the writer produces its own.
fn rewrite(doc: &mut PdfDocument, config: &EngineConfig) -> Result<PdfWriter> {
    let root = match doc.trailer().get("Root") {
        Some(Object::Reference(r)) => *r,
        _ => return Err(Error::InvalidPdf("trailer has no /Root reference".to_string())),
    };
    let info = match doc.trailer().get("Info") {
        Some(Object::Reference(r)) => Some(*r),
        _ => None,
    };
    let encrypt_id = doc.encrypt_dict_id();

    let mut writer = PdfWriter::new(config.writer.clone());
    for obj_ref in doc.object_refs() {
        if Some(obj_ref.id) == encrypt_id {
            continue;
        }
        let object = match doc.get_object(obj_ref) {
            Ok(object) => object,
            Err(Error::ObjectNotFound(..)) | Err(Error::ParseError { .. }) => {
                log::warn!("Skipping unreadable object {}", obj_ref);
                continue;
            },
            Err(e) => return Err(e),
        };
        if matches!(object.dict_type(), Some("XRef") | Some("ObjStm")) && object.is_stream() {
            continue;
        }
        writer.insert(obj_ref, object);
    }

    writer.set_root(root);
    if let Some(info) = info {
        writer.set_info(info);
    }
    log::debug!("Rewriting {} objects", writer.len());
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;
    use crate::writer::{ObjectSerializer, WriterConfig};

    fn one_page() -> Vec<u8> {
        let mut writer = PdfWriter::new(WriterConfig::classic());
        writer.insert(
            ObjectRef::new(1, 0),
            ObjectSerializer::dict(vec![("Type", Object::name("Catalog")), ("Pages", ObjectSerializer::reference(2, 0))]),
        );
        writer.insert(
            ObjectRef::new(2, 0),
            ObjectSerializer::dict(vec![
                ("Type", Object::name("Pages")),
                ("Kids", Object::Array(vec![ObjectSerializer::reference(3, 0)])),
                ("Count", Object::Integer(1)),
            ]),
        );
        writer.insert(
            ObjectRef::new(3, 0),
            ObjectSerializer::dict(vec![
                ("Type", Object::name("Page")),
                ("Parent", ObjectSerializer::reference(2, 0)),
                ("Contents", ObjectSerializer::reference(4, 0)),
            ]),
        );
        writer.insert(ObjectRef::new(4, 0), Object::stream(Default::default(), b"BT (hi) Tj ET".to_vec()));
        writer.set_root(ObjectRef::new(1, 0));
        writer.finish().unwrap()
    }

    #[test]
    fn test_compress_requires_input() {
        assert!(matches!(compress(&[]), Err(Error::EmptyInput)));
        assert!(matches!(compress(&[&b""[..]]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_size_limit_applies_to_every_input() {
        let pdf = one_page();
        let config = EngineConfig::new().with_max_document_size(pdf.len() - 1);
        assert!(matches!(
            compress_with(&[&pdf], &config),
            Err(Error::DocumentTooLarge { .. })
        ));
        assert!(matches!(
            protect_with(&pdf, &ProtectOptions::new("x"), &config),
            Err(Error::DocumentTooLarge { .. })
        ));
    }

    #[test]
    fn test_protect_then_inspect() {
        let locked = protect(&one_page(), "pw").unwrap();
        let summary = inspect(&locked).unwrap();
        assert!(summary.encrypted);
        assert_eq!(summary.algorithm, Some(Algorithm::Aes128));
        assert_eq!(summary.page_count, 0);
    }

    #[test]
    fn test_decrypt_restores_content() {
        let locked = protect(&one_page(), "pw").unwrap();
        let opened = decrypt(&locked, "pw").unwrap();

        let mut doc = PdfDocument::load(opened).unwrap();
        assert!(!doc.is_encrypted());
        let page = doc.pages().unwrap().remove(0);
        let content = doc.resolve(&page.dict["Contents"]).unwrap();
        assert_eq!(content.decode_stream_data().unwrap(), b"BT (hi) Tj ET");
    }

    #[test]
    fn test_decrypt_wrong_password() {
        let locked = protect(&one_page(), "pw").unwrap();
        assert!(matches!(decrypt(&locked, "nope"), Err(Error::WrongPassword)));
    }

    #[test]
    fn test_empty_password_opens_without_prompt() {
        let locked = protect(&one_page(), "").unwrap();
        let summary = inspect(&locked).unwrap();
        assert!(summary.encrypted);
        assert_eq!(summary.page_count, 1);
    }
}
