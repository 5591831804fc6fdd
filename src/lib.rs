// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Press
//!
//! PDF compaction and password protection in Rust.
//!
//! ## Core Features
//!
//! ### Compress
//! - **Merge**: Pages of every input concatenated in order under a fresh page tree
//! - **Deduplication**: Fonts, images and other resources collapse by content hash
//! - **Garbage Collection**: Only objects reachable from a page are written
//! - **Compact Layout**: Object streams, a Flate-compressed cross-reference stream,
//!   Flate applied to uncompressed streams where it helps
//!
//! ### Protect
//! - **Standard Security Handler**: RC4-40 (R2), RC4-128 (R3), AES-128 (R4), AES-256 (R6)
//! - **Permissions**: Print, modify, copy, annotate, fill forms, extract, assemble
//! - **Decrypt**: User or owner password, R2 through R6
//!
//! ### Reading
//! - **Tolerant Parsing**: Brute-force object scan when the cross-reference data is broken
//! - **Lazy Resolution**: Objects parsed on first access and cached
//! - **Stream Filters**: Flate, LZW, RunLength, ASCIIHex, ASCII85, DCT passthrough, PNG/TIFF predictors
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_press::api;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let a = std::fs::read("a.pdf")?;
//! let b = std::fs::read("b.pdf")?;
//!
//! let merged = api::compress(&[&a, &b])?;
//! let protected = api::protect(&merged, "secret")?;
//! std::fs::write("out.pdf", protected)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`error::Result`]. [`Error::class`] tells an
//! unreadable input apart from an unsupported request or a rejected password.
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
/// Parser configuration options
pub mod parser_config;
pub mod xref;
pub mod xref_reconstruction;

// Stream decoders
pub mod decoders;

// Encryption support
pub mod encryption;

// PDF writing
pub mod writer;

// Multi-document merge and deduplication
pub mod compaction;

// Configuration
pub mod config;

// Boundary operations
pub mod api;

// Re-exports
pub use api::{compress, decrypt, inspect, merge, protect, protect_with, DocumentSummary};
pub use config::{EngineConfig, ProtectOptions};
pub use document::PdfDocument;
pub use encryption::{Algorithm, Permissions};
pub use error::{Error, ErrorClass, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_press");
    }
}
