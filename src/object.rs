//! PDF object types.
//!
//! The value model shared by the parser, the document arena and the writers.

use crate::decoders::{DecodeParams, DecodedStream};
use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;
use std::collections::HashMap;

/// Dictionary payload: PDF name (without the slash) to value.
pub type Dict = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dict),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Raw (still encoded) stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Build a stream object from a dictionary and raw bytes.
    pub fn stream(dict: Dict, data: impl Into<bytes::Bytes>) -> Self {
        Object::Stream {
            dict,
            data: data.into(),
        }
    }

    /// Shorthand for `Object::Name`.
    pub fn name(s: &str) -> Self {
        Object::Name(s.to_string())
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real, as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for both Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// True for streams.
    pub fn is_stream(&self) -> bool {
        matches!(self, Object::Stream { .. })
    }

    /// Value of `/Type` when this is a dictionary or stream.
    pub fn dict_type(&self) -> Option<&str> {
        self.as_dict()?.get("Type")?.as_name()
    }

    /// Collect every reference held directly or in nested containers.
    ///
    /// References are appended in document order (dictionary keys sorted).
    pub fn collect_references(&self, out: &mut Vec<ObjectRef>) {
        match self {
            Object::Reference(r) => out.push(*r),
            Object::Array(arr) => arr.iter().for_each(|o| o.collect_references(out)),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                let mut keys: Vec<&String> = dict.keys().collect();
                keys.sort();
                for key in keys {
                    dict[key].collect_references(out);
                }
            },
            _ => {},
        }
    }

    /// Replace every reference with the object returned by `f`.
    pub fn remap_references<F>(&mut self, f: &mut F)
    where
        F: FnMut(ObjectRef) -> Object,
    {
        match self {
            Object::Reference(r) => *self = f(*r),
            Object::Array(arr) => arr.iter_mut().for_each(|o| o.remap_references(f)),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                dict.values_mut().for_each(|o| o.remap_references(f))
            },
            _ => {},
        }
    }

    /// Filter names of a stream, in application order.
    pub fn filters(&self) -> Vec<String> {
        self.as_dict()
            .and_then(|d| d.get("Filter"))
            .map(extract_filter_names)
            .unwrap_or_default()
    }

    /// Decode stream data using filters specified in the stream dictionary.
    ///
    /// Fails with [`Error::UnsupportedFilter`] if the chain names a filter the
    /// engine cannot decode.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        self.decode_stream_with_options(&ParserOptions::default())?
            .into_result()
    }

    /// Decode as far as the filter chain allows.
    ///
    /// Decoding stops at the first unknown filter; the partially decoded bytes
    /// and the filters still to apply are returned in the [`DecodedStream`].
    ///
    /// PDF Spec: ISO 32000-1:2008, Section 7.3.8.2 - Stream Objects
    pub fn decode_stream_with_options(&self, options: &ParserOptions) -> Result<DecodedStream> {
        match self {
            Object::Stream { dict, data } => {
                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();
                let params = extract_decode_params(dict.get("DecodeParms"), filters.len());
                crate::decoders::decode_stream_with_options(data, &filters, &params, options)
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }
}

/// Extract filter names from a Filter object.
///
/// The Filter entry can be either:
/// - A single Name (e.g., /FlateDecode)
/// - An Array of Names (e.g., [/ASCII85Decode /FlateDecode])
pub(crate) fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

/// Extract per-filter decode parameters from a DecodeParms object.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.4.2 - LZWDecode and FlateDecode Parameters
///
/// A single dictionary applies to a single filter; an array is matched to the
/// filter chain by position. The result always has `filter_count` entries.
pub(crate) fn extract_decode_params(
    params_obj: Option<&Object>,
    filter_count: usize,
) -> Vec<Option<DecodeParams>> {
    let mut out = vec![None; filter_count];
    match params_obj {
        Some(Object::Dictionary(d)) => {
            if let Some(slot) = out.first_mut() {
                *slot = Some(DecodeParams::from_dict(d));
            }
        },
        Some(Object::Array(arr)) => {
            for (slot, obj) in out.iter_mut().zip(arr) {
                *slot = obj.as_dict().map(DecodeParams::from_dict);
            }
        },
        _ => {},
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert_eq!(obj.as_number(), Some(42.0));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::name("Type");
        assert_eq!(obj.as_name(), Some("Type"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_object_array() {
        let obj = Object::Array(vec![Object::Integer(1), Object::Integer(2)]);
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0].as_integer(), Some(1));
    }

    #[test]
    fn test_object_stream_dict_access() {
        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("XObject"));
        let obj = Object::stream(dict, b"data".to_vec());
        assert!(obj.is_stream());
        assert_eq!(obj.dict_type(), Some("XObject"));
    }

    #[test]
    fn test_collect_references_sorted_keys() {
        let mut dict = Dict::new();
        dict.insert("B".to_string(), Object::Reference(ObjectRef::new(2, 0)));
        dict.insert(
            "A".to_string(),
            Object::Array(vec![
                Object::Reference(ObjectRef::new(5, 0)),
                Object::Reference(ObjectRef::new(1, 0)),
            ]),
        );
        let mut refs = Vec::new();
        Object::Dictionary(dict).collect_references(&mut refs);
        assert_eq!(refs, vec![ObjectRef::new(5, 0), ObjectRef::new(1, 0), ObjectRef::new(2, 0)]);
    }

    #[test]
    fn test_remap_references() {
        let mut obj = Object::Array(vec![
            Object::Reference(ObjectRef::new(7, 0)),
            Object::Reference(ObjectRef::new(8, 0)),
        ]);
        obj.remap_references(&mut |r| {
            if r.id == 7 {
                Object::Reference(ObjectRef::new(3, 0))
            } else {
                Object::Null
            }
        });
        assert_eq!(
            obj,
            Object::Array(vec![Object::Reference(ObjectRef::new(3, 0)), Object::Null])
        );
    }

    #[test]
    fn test_filter_names_single_and_array() {
        assert_eq!(extract_filter_names(&Object::name("FlateDecode")), vec!["FlateDecode"]);
        let arr = Object::Array(vec![Object::name("ASCIIHexDecode"), Object::name("FlateDecode")]);
        assert_eq!(extract_filter_names(&arr), vec!["ASCIIHexDecode", "FlateDecode"]);
    }

    #[test]
    fn test_decode_params_aligned_with_filters() {
        let mut parms = Dict::new();
        parms.insert("Predictor".to_string(), Object::Integer(12));
        parms.insert("Columns".to_string(), Object::Integer(4));
        let arr = Object::Array(vec![Object::Null, Object::Dictionary(parms)]);
        let params = extract_decode_params(Some(&arr), 2);
        assert!(params[0].is_none());
        assert_eq!(params[1].as_ref().map(|p| p.predictor), Some(12));
        assert_eq!(params[1].as_ref().map(|p| p.columns), Some(4));
    }

    #[test]
    fn test_decode_unfiltered_stream() {
        let obj = Object::stream(Dict::new(), b"BT ET".to_vec());
        assert_eq!(obj.decode_stream_data().unwrap(), b"BT ET");
    }

    #[test]
    fn test_decode_unknown_filter_is_unsupported() {
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::name("JBIG2Decode"));
        let obj = Object::stream(dict, b"raw".to_vec());
        assert!(matches!(obj.decode_stream_data(), Err(Error::UnsupportedFilter(_))));

        let partial = obj.decode_stream_with_options(&ParserOptions::default()).unwrap();
        assert_eq!(partial.data, b"raw");
        assert_eq!(partial.remaining_filters, vec!["JBIG2Decode".to_string()]);
    }

    #[test]
    fn test_decode_on_non_stream_fails() {
        assert!(matches!(
            Object::Integer(1).decode_stream_data(),
            Err(Error::InvalidObjectType { .. })
        ));
    }
}
