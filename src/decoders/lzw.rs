//! LZWDecode implementation for PDF.
//!
//! PDF's LZW variant (Section 7.4.4):
//! - MSB-first bit ordering
//! - Starts with 9-bit codes, grows to 12
//! - Clear code is 256, EOD code is 257, first table code is 258
//! - With EarlyChange=1 (the default) the code width grows one code early,
//!   the same switch point TIFF uses
//!
//! weezl does the work; a small table-driven decoder handles streams that
//! weezl rejects (missing clear code, truncated tails).

use crate::decoders::StreamCodec;
use crate::error::{Error, Result};
use weezl::{decode::Decoder as WeezlDecoder, encode::Encoder as WeezlEncoder, BitOrder};

/// LZWDecode filter implementation.
pub struct LzwDecoder {
    /// `/EarlyChange` flag from the decode parameters
    pub early_change: bool,
}

impl Default for LzwDecoder {
    fn default() -> Self {
        Self { early_change: true }
    }
}

impl StreamCodec for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = if self.early_change {
            WeezlDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            WeezlDecoder::new(BitOrder::Msb, 8)
        };

        match decoder.decode(input) {
            Ok(output) => Ok(output),
            Err(e) => {
                log::debug!("weezl LZW decode failed: {:?}, using table decoder", e);
                decode_lzw_table(input, self.early_change)
            },
        }
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = if self.early_change {
            WeezlEncoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            WeezlEncoder::new(BitOrder::Msb, 8)
        };
        encoder
            .encode(input)
            .map_err(|e| Error::Decode(format!("LZW encode failed: {:?}", e)))
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

const CLEAR_CODE: usize = 256;
const EOD_CODE: usize = 257;
const FIRST_CODE: usize = 258;
const MAX_CODE_BITS: u8 = 12;

fn initial_table() -> Vec<Vec<u8>> {
    let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    // Placeholders for the clear and EOD codes
    table.push(Vec::new());
    table.push(Vec::new());
    table
}

/// Table-driven LZW decoder, tolerant of a missing EOD code.
fn decode_lzw_table(input: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let early = usize::from(early_change);
    let mut output = Vec::new();
    let mut table = initial_table();
    let mut code_bits = 9u8;
    let mut reader = BitReader::new(input);
    let mut prev: Option<usize> = None;

    while let Some(code) = reader.read_bits(code_bits) {
        let code = code as usize;

        if code == EOD_CODE {
            break;
        }
        if code == CLEAR_CODE {
            table = initial_table();
            code_bits = 9;
            prev = None;
            continue;
        }

        let entry = match (table.get(code), prev) {
            (Some(e), _) if code < 256 || code >= FIRST_CODE => e.clone(),
            (None, Some(p)) if code == table.len() => {
                let mut s = table[p].clone();
                s.push(table[p][0]);
                s
            },
            _ => {
                return Err(Error::Decode(format!(
                    "Invalid LZW code: {} (table size: {}, code_bits={})",
                    code,
                    table.len(),
                    code_bits
                )));
            },
        };

        output.extend_from_slice(&entry);

        if let Some(p) = prev {
            if table.len() < 4096 {
                let mut new_entry = table[p].clone();
                new_entry.push(entry[0]);
                table.push(new_entry);
            }
        }

        if table.len() + early >= (1 << code_bits) && code_bits < MAX_CODE_BITS {
            code_bits += 1;
        }

        prev = Some(code);
    }

    Ok(output)
}

/// Bit reader for MSB-first bit ordering.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn read_bits(&mut self, n: u8) -> Option<u32> {
        if self.bit_pos + n as usize > self.data.len() * 8 {
            return None;
        }

        let mut result = 0u32;
        for _ in 0..n {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            result = (result << 1) | bit as u32;
            self.bit_pos += 1;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lzw_round_trip() {
        let original = b"ABCABCABCABC";
        let codec = LzwDecoder::default();
        let compressed = codec.encode(original).unwrap();
        assert_eq!(codec.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_lzw_empty() {
        let codec = LzwDecoder::default();
        let compressed = codec.encode(b"").unwrap();
        assert!(codec.decode(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_lzw_repeated_pattern_grows_code_width() {
        // Long enough to push the table past 511 and 1023 entries
        let original: Vec<u8> = (0..20_000u32).map(|i| ((i * 7) % 251) as u8).collect();
        for early_change in [true, false] {
            let codec = LzwDecoder { early_change };
            let compressed = codec.encode(&original).unwrap();
            assert_eq!(codec.decode(&compressed).unwrap(), original);
        }
    }

    #[test]
    fn test_table_decoder_matches_weezl() {
        let original = b"The quick brown fox jumps over the lazy dog. ".repeat(40);
        let compressed = LzwDecoder::default().encode(&original).unwrap();
        assert_eq!(decode_lzw_table(&compressed, true).unwrap(), original);
    }

    #[test]
    fn test_spec_example_sequence() {
        // ISO 32000-1 Section 7.4.4.2 example: 45 45 45 45 45 65 45 45 45 66
        let encoded = [0x80, 0x0B, 0x60, 0x50, 0x22, 0x0C, 0x0C, 0x85, 0x01];
        let decoded = LzwDecoder::default().decode(&encoded).unwrap();
        assert_eq!(decoded, vec![45, 45, 45, 45, 45, 65, 45, 45, 45, 66]);
    }

    #[test]
    fn test_lzw_decoder_name() {
        assert_eq!(LzwDecoder::default().name(), "LZWDecode");
    }
}
