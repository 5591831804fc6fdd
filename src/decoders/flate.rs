//! FlateDecode (zlib/deflate) implementation.
//!
//! This is the most common PDF compression filter, and the one the writer
//! applies to every stream it compresses. Uses the flate2 crate, with the
//! inflate and libflate crates as fallbacks for damaged data.

use crate::decoders::StreamCodec;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use inflate::inflate_bytes_zlib;
use libflate::zlib::Decoder as LibflateDecoder;
use std::io::{Read, Write};

/// FlateDecode filter implementation.
pub struct FlateDecoder;

impl StreamCodec for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();

        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return Ok(output),
            Err(e) => e,
        };

        // Partial recovery: keep whatever decoded before the corruption
        if !output.is_empty() {
            log::warn!(
                "FlateDecode partial recovery: extracted {} bytes before corruption: {}",
                output.len(),
                zlib_err
            );
            return Ok(output);
        }

        // Raw deflate, first as-is and then past a damaged 2-byte zlib header
        for skip in [0usize, 2] {
            if input.len() <= skip {
                break;
            }
            output.clear();
            let result = DeflateDecoder::new(&input[skip..]).read_to_end(&mut output);
            if result.is_ok() || !output.is_empty() {
                log::info!("Raw deflate recovery (skip {}) produced {} bytes", skip, output.len());
                return Ok(output);
            }
        }

        match inflate_bytes_zlib(input) {
            Ok(data) => {
                log::info!("Inflate crate recovery succeeded: {} bytes", data.len());
                return Ok(data);
            },
            Err(e) => log::debug!("Inflate crate failed: {}", e),
        }

        output.clear();
        if let Ok(mut decoder) = LibflateDecoder::new(input) {
            if let Err(e) = decoder.read_to_end(&mut output) {
                log::debug!("Libflate failed: {}", e);
            }
            if !output.is_empty() {
                log::info!("Libflate recovery produced {} bytes", output.len());
                return Ok(output);
            }
        }

        // Invalid compression method nibble: force CM = 8 (deflate)
        if input.len() >= 2 && input[0] & 0x0F != 8 {
            let mut corrected = input.to_vec();
            corrected[0] = (input[0] & 0xF0) | 0x08;
            output.clear();
            let result = ZlibDecoder::new(&corrected[..]).read_to_end(&mut output);
            if result.is_ok() || !output.is_empty() {
                log::info!("Header correction recovery: {} bytes", output.len());
                return Ok(output);
            }
        }

        log::error!("All FlateDecode recovery strategies failed: {}", zlib_err);
        Err(Error::Decode(format!(
            "FlateDecode decompression failed: {}. Compressed size: {} bytes.",
            zlib_err,
            input.len()
        )))
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len() / 2), Compression::best());
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flate_round_trip() {
        let original = b"Hello, FlateDecode!";
        let compressed = FlateDecoder.encode(original).unwrap();
        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_flate_decode_empty() {
        let compressed = FlateDecoder.encode(b"").unwrap();
        assert!(FlateDecoder.decode(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_flate_shrinks_repetitive_data() {
        let original = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".repeat(1000);
        let compressed = FlateDecoder.encode(&original).unwrap();
        assert!(compressed.len() < original.len() / 10);
        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_flate_raw_deflate_recovery() {
        use flate2::write::DeflateEncoder;
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"q 1 0 0 1 0 0 cm Q").unwrap();
        let raw = encoder.finish().unwrap();
        assert_eq!(FlateDecoder.decode(&raw).unwrap(), b"q 1 0 0 1 0 0 cm Q");
    }

    #[test]
    fn test_flate_decode_invalid_data() {
        let result = FlateDecoder.decode(b"This is not zlib compressed data");
        match result {
            Err(Error::Decode(msg)) => assert!(msg.contains("FlateDecode decompression failed")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_flate_decoder_name() {
        assert_eq!(FlateDecoder.name(), "FlateDecode");
    }
}
