//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! PDF specification ISO 32000-1:2008. Dictionary keys are always written in
//! sorted order, so equal objects serialize to equal bytes.

use crate::object::{Dict, Object, ObjectRef};
use std::io::Write;

/// Serializer for PDF objects.
///
/// Converts PDF Object types to their byte representation following
/// the PDF specification syntax rules.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
    /// Write every reference as a bare `R` (content hashing)
    ref_placeholders: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self {
            compact: true,
            ref_placeholders: false,
        }
    }

    /// Compact serializer that writes references as a bare `R` token.
    ///
    /// The output identifies an object's own content; the targets of its
    /// references are accounted for separately by the caller.
    pub fn canonical() -> Self {
        Self {
            compact: true,
            ref_placeholders: true,
        }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // Vec<u8> writes are infallible
        let _ = self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", id, gen).into_bytes();
        let _ = self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    /// Write an object to a writer.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => self.write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(_) if self.ref_placeholders => write!(w, "R"),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    /// Write a real number with appropriate precision.
    fn write_real<W: Write>(&self, w: &mut W, value: f64) -> std::io::Result<()> {
        if !value.is_finite() {
            return write!(w, "0");
        }
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            write!(w, "{}", value as i64)
        } else {
            // Up to 5 decimal places, trailing zeros trimmed
            let formatted = format!("{:.5}", value);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            match trimmed {
                "" | "-" | "-0" => write!(w, "0"),
                t => write!(w, "{}", t),
            }
        }
    }

    /// Write a PDF string.
    ///
    /// Uses literal string syntax `(...)` with proper escaping,
    /// or hex string syntax `<...>` for binary data.
    fn write_string<W: Write>(&self, w: &mut W, data: &[u8]) -> std::io::Result<()> {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if is_printable {
            w.write_all(b"(")?;
            for &byte in data {
                match byte {
                    b'(' => w.write_all(b"\\(")?,
                    b')' => w.write_all(b"\\)")?,
                    b'\\' => w.write_all(b"\\\\")?,
                    b'\n' => w.write_all(b"\\n")?,
                    b'\r' => w.write_all(b"\\r")?,
                    b'\t' => w.write_all(b"\\t")?,
                    _ => w.write_all(&[byte])?,
                }
            }
            w.write_all(b")")
        } else {
            w.write_all(b"<")?;
            for byte in data {
                write!(w, "{:02X}", byte)?;
            }
            w.write_all(b">")
        }
    }

    /// Write a PDF name.
    ///
    /// Names start with `/`; delimiters, whitespace, `#` and bytes outside
    /// the printable ASCII range are written as `#xx`.
    fn write_name<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        w.write_all(b"/")?;
        for byte in name.bytes() {
            if (0x21..=0x7E).contains(&byte) && byte != b'#' && crate::lexer::is_regular(byte) {
                w.write_all(&[byte])?;
            } else {
                write!(w, "#{:02X}", byte)?;
            }
        }
        Ok(())
    }

    /// Write a PDF array.
    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        w.write_all(b"[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                w.write_all(b" ")?;
            }
            self.write_object(w, obj)?;
        }
        w.write_all(b"]")
    }

    /// Write a PDF dictionary.
    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dict) -> std::io::Result<()> {
        w.write_all(b"<<")?;

        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if !self.compact {
                w.write_all(b"\n  ")?;
            }
            self.write_name(w, key)?;
            w.write_all(b" ")?;
            self.write_object(w, &dict[key])?;
        }

        if !self.compact && !dict.is_empty() {
            writeln!(w)?;
        }
        w.write_all(b">>")
    }

    /// Write a PDF stream.
    ///
    /// `/Length` always reflects `data`; any stale value is replaced.
    fn write_stream<W: Write>(&self, w: &mut W, dict: &Dict, data: &[u8]) -> std::io::Result<()> {
        let mut dict_with_length = dict.clone();
        if self.ref_placeholders {
            dict_with_length.remove("Length");
        } else {
            dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));
        }

        self.write_dictionary(w, &dict_with_length)?;
        w.write_all(b"\nstream\n")?;
        w.write_all(data)?;
        w.write_all(b"\nendstream")
    }
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Dictionary object.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Create a Reference object.
    pub fn reference(id: u32, gen: u16) -> Object {
        Object::Reference(ObjectRef::new(id, gen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_object;

    #[test]
    fn test_serialize_primitives() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Null), "null");
        assert_eq!(s.serialize_to_string(&Object::Boolean(true)), "true");
        assert_eq!(s.serialize_to_string(&Object::Boolean(false)), "false");
        assert_eq!(s.serialize_to_string(&Object::Integer(-123)), "-123");
    }

    #[test]
    fn test_serialize_real() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Real(3.14258)), "3.14258");
        assert_eq!(s.serialize_to_string(&Object::Real(1.0)), "1");
        assert_eq!(s.serialize_to_string(&Object::Real(0.5)), "0.5");
        assert_eq!(s.serialize_to_string(&Object::Real(-0.000001)), "0");
        assert_eq!(s.serialize_to_string(&Object::Real(f64::NAN)), "0");
    }

    #[test]
    fn test_serialize_string() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::String(b"Hello".to_vec())), "(Hello)");
        assert_eq!(
            s.serialize_to_string(&Object::String(b"Test (parens)".to_vec())),
            "(Test \\(parens\\))"
        );
        assert_eq!(s.serialize_to_string(&Object::String(vec![0x00, 0xFF, 0x80])), "<00FF80>");
    }

    #[test]
    fn test_serialize_name_escapes_delimiters() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::name("Type")), "/Type");
        assert_eq!(s.serialize_to_string(&Object::name("Name With Space")), "/Name#20With#20Space");
        assert_eq!(s.serialize_to_string(&Object::name("A<B>(C)#%")), "/A#3CB#3E#28C#29#23#25");
    }

    #[test]
    fn test_serialize_dictionary_sorted() {
        let s = ObjectSerializer::compact();
        let dict = ObjectSerializer::dict(vec![
            ("Type", Object::name("Page")),
            ("Count", Object::Integer(1)),
            ("Parent", ObjectSerializer::reference(3, 0)),
        ]);
        assert_eq!(s.serialize_to_string(&dict), "<</Count 1/Parent 3 0 R/Type /Page>>");
    }

    #[test]
    fn test_serialize_indirect() {
        let bytes = ObjectSerializer::new().serialize_indirect(1, 0, &Object::Integer(42));
        assert_eq!(bytes, b"1 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_serialize_stream_replaces_length() {
        let s = ObjectSerializer::compact();
        let mut dict = Dict::new();
        dict.insert("Length".to_string(), Object::Integer(999));
        let stream = Object::stream(dict, &b"stream data"[..]);

        let result = s.serialize_to_string(&stream);
        assert!(result.contains("/Length 11"));
        assert!(result.ends_with("stream\nstream data\nendstream"));
    }

    #[test]
    fn test_canonical_ignores_reference_targets() {
        let s = ObjectSerializer::canonical();
        let a = Object::Array(vec![ObjectSerializer::reference(4, 0)]);
        let b = Object::Array(vec![ObjectSerializer::reference(9, 2)]);
        assert_eq!(s.serialize(&a), s.serialize(&b));
        assert_eq!(s.serialize_to_string(&a), "[R]");
    }

    #[test]
    fn test_serialized_objects_parse_back() {
        let s = ObjectSerializer::compact();
        let original = ObjectSerializer::dict(vec![
            ("Kids", Object::Array(vec![ObjectSerializer::reference(2, 0), Object::Null])),
            ("Title", Object::String(b"a (nested) \\ string".to_vec())),
            ("Odd", Object::name("x y#z")),
            ("Bin", Object::String(vec![0, 1, 2, 255])),
            ("Scale", Object::Real(0.25)),
        ]);

        let bytes = s.serialize(&original);
        let (_, parsed) = parse_object(&bytes).unwrap();
        assert_eq!(parsed, original);
    }
}
