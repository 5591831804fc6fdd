//! PDF writing module.
//!
//! ## Architecture
//!
//! ```text
//! object table (id -> Object)
//!     ↓
//! [PdfWriter] (object streams, encryption, xref stream or table, trailer)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! [`ObjectSerializer::canonical`] produces the reference-free form that
//! compaction hashes to find duplicate objects.

mod object_serializer;
mod pdf_writer;

pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PdfWriter, WriterConfig};
