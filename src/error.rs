//! Error types for the PDF engine.
//!
//! Every failure surfaced by the boundary operations is one of these variants.
//! [`Error::class`] sorts them into "the file is unreadable", "the request is
//! unsupported" and "the password was rejected" so callers can report them
//! without inspecting individual variants.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`] for user-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The supplied document could not be read.
    Unreadable,
    /// The document was readable but the request cannot be honoured.
    Unsupported,
    /// Authentication against an encrypted document failed.
    Denied,
}

/// Error types that can occur during PDF processing.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)] // "Invalid" prefix is intentional for clarity
pub enum Error {
    /// A token could not be completed (unterminated string or stream) in strict mode
    #[error("Malformed token at byte {offset}: {reason}")]
    MalformedToken {
        /// Byte offset where the token started
        offset: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Cross-reference data is unusable (loop, out-of-bounds offset, page tree cycle)
    #[error("Corrupt cross-reference data: {0}")]
    CorruptXRef(String),

    /// Stream filter the engine cannot decode
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Requested permission mask sets reserved bits
    #[error("Invalid permissions: {0}")]
    InvalidPermissions(String),

    /// Security handler revision the engine does not implement
    #[error("Unsupported security handler revision: {0}")]
    UnsupportedRevision(u32),

    /// Input exceeds the configured size limit
    #[error("Document too large: {size} bytes exceeds limit of {limit} bytes")]
    DocumentTooLarge {
        /// Size of the rejected document
        size: usize,
        /// Configured maximum
        limit: usize,
    },

    /// No document bytes were supplied
    #[error("Empty input: no document data supplied")]
    EmptyInput,

    /// Password did not authenticate against the encryption dictionary
    #[error("Incorrect password")]
    WrongPassword,

    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Cipher failure while encrypting or decrypting
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error for reporting.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::UnsupportedFilter(_)
            | Error::InvalidPermissions(_)
            | Error::UnsupportedRevision(_)
            | Error::DocumentTooLarge { .. }
            | Error::EmptyInput => ErrorClass::Unsupported,
            Error::WrongPassword => ErrorClass::Denied,
            _ => ErrorClass::Unreadable,
        }
    }

    /// True when the input document itself is at fault.
    pub fn is_unreadable(&self) -> bool {
        self.class() == ErrorClass::Unreadable
    }
}
