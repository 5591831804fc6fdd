//! Integration tests for stream codecs.
//!
//! Tests all codecs with various scenarios including:
//! - Individual codec functionality against reference encoders
//! - Filter pipelines (multiple codecs chained)
//! - Unknown filters passing data through
//! - Integration with Object::decode_stream_data()

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_press::decoders::{
    decode_stream, decode_stream_with_options, encode_stream, Ascii85Decoder, AsciiHexDecoder, DctDecoder,
    DecodeParams, FlateDecoder, LzwDecoder, RunLengthDecoder, StreamCodec,
};
use pdf_press::error::Error;
use pdf_press::object::{Dict, Object};
use pdf_press::parser_config::ParserOptions;
use proptest::prelude::*;
use std::io::Write;
use weezl::{encode::Encoder as LzwEncoder, BitOrder};

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn stream(filter: Object, data: &[u8]) -> Object {
    let mut dict = Dict::new();
    dict.insert("Filter".to_string(), filter);
    Object::stream(dict, data.to_vec())
}

// ============================================================================
// Individual codecs
// ============================================================================

#[test]
fn test_flate_decoder_integration() {
    let original = b"This is a test of FlateDecode compression in a PDF stream.";
    let decoded = FlateDecoder.decode(&zlib(original)).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_ascii_hex_decoder_integration() {
    assert_eq!(AsciiHexDecoder.decode(b"48 65 6C\n6C 6F>").unwrap(), b"Hello");
    // odd digit count pads with zero
    assert_eq!(AsciiHexDecoder.decode(b"7>").unwrap(), b"\x70");
}

#[test]
fn test_ascii85_decoder_integration() {
    assert_eq!(Ascii85Decoder.decode(b"z~>").unwrap(), b"\x00\x00\x00\x00");
    assert_eq!(Ascii85Decoder.decode(b"<+U,m~>").unwrap(), b"Test");
}

#[test]
fn test_lzw_decoder_against_reference_encoder() {
    let original = b"ABABABABABABABABABABABABABABAB";
    let mut encoder = LzwEncoder::with_tiff_size_switch(BitOrder::Msb, 8);
    let compressed = encoder.encode(original).unwrap();

    let decoded = LzwDecoder::default().decode(&compressed).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_runlength_decoder_integration() {
    assert_eq!(RunLengthDecoder.decode(&[2, b'A', b'B', b'C', 128]).unwrap(), b"ABC");
    assert_eq!(RunLengthDecoder.decode(&[250, b'X', 128]).unwrap(), b"XXXXXXX");
}

#[test]
fn test_dct_passthrough() {
    let jpeg = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01";
    assert_eq!(DctDecoder.decode(jpeg).unwrap(), jpeg);
    assert_eq!(DctDecoder.encode(jpeg).unwrap(), jpeg);
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn test_pipeline_hex_then_flate() {
    let original = b"Hello, World!";
    let hex: String = zlib(original).iter().map(|b| format!("{:02X}", b)).collect();

    let filters = vec!["ASCIIHexDecode".to_string(), "FlateDecode".to_string()];
    assert_eq!(decode_stream(hex.as_bytes(), &filters).unwrap(), original);
}

#[test]
fn test_pipeline_encode_matches_decode() {
    let original: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
    let filters = vec!["ASCII85Decode".to_string(), "FlateDecode".to_string()];
    let params = vec![None, Some(DecodeParams::png_up(30))];

    let encoded = encode_stream(&original, &filters, &params).unwrap();
    assert!(encoded.iter().all(|b| b.is_ascii()));

    let decoded = decode_stream_with_options(&encoded, &filters, &params, &ParserOptions::default())
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_unknown_filter_passes_data_through() {
    let data = b"opaque jbig2 payload";
    let filters = vec!["JBIG2Decode".to_string()];

    let partial = decode_stream_with_options(data, &filters, &[], &ParserOptions::default()).unwrap();
    assert!(!partial.is_complete());
    assert_eq!(partial.data, data);
    assert_eq!(partial.remaining_filters, filters);

    assert!(matches!(decode_stream(data, &filters), Err(Error::UnsupportedFilter(name)) if name == "JBIG2Decode"));
}

#[test]
fn test_decompression_bomb_rejected() {
    let bomb = zlib(&vec![0u8; 1_000_000]);
    let filters = vec!["FlateDecode".to_string()];
    let result = decode_stream_with_options(&bomb, &filters, &[], &ParserOptions::strict());
    assert!(matches!(result, Err(Error::Decode(_))));
}

// ============================================================================
// Object integration
// ============================================================================

#[test]
fn test_object_decode_with_filter_array() {
    let original = b"BT /F1 12 Tf (Hi) Tj ET";
    let hex: String = zlib(original).iter().map(|b| format!("{:02x}", b)).collect();
    let obj = stream(
        Object::Array(vec![Object::name("AHx"), Object::name("Fl")]),
        hex.as_bytes(),
    );
    assert_eq!(obj.decode_stream_data().unwrap(), original);
}

#[test]
fn test_object_decode_with_predictor_params() {
    let rows: Vec<u8> = (0..40u8).collect();
    let params = DecodeParams::png_up(10);
    let encoded = encode_stream(&rows, &["FlateDecode".to_string()], &[Some(params.clone())]).unwrap();

    let mut obj = stream(Object::name("FlateDecode"), &encoded);
    if let Object::Stream { dict, .. } = &mut obj {
        dict.insert("DecodeParms".to_string(), Object::Dictionary(params.to_dict()));
    }
    assert_eq!(obj.decode_stream_data().unwrap(), rows);
}

#[test]
fn test_decode_non_stream_fails() {
    assert!(matches!(
        Object::Integer(1).decode_stream_data(),
        Err(Error::InvalidObjectType { .. })
    ));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_every_codec_inverts(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let codecs: Vec<Box<dyn StreamCodec>> = vec![
            Box::new(FlateDecoder),
            Box::new(AsciiHexDecoder),
            Box::new(Ascii85Decoder),
            Box::new(LzwDecoder::default()),
            Box::new(RunLengthDecoder),
        ];
        for codec in codecs {
            let encoded = codec.encode(&data).unwrap();
            prop_assert_eq!(codec.decode(&encoded).unwrap(), data.clone(), "{}", codec.name());
        }
    }
}
