//! ASCIIHexDecode implementation.
//!
//! Each pair of hex digits is one byte. Whitespace is ignored, `>` marks
//! end of data, and an odd final digit is padded with 0.

use crate::decoders::StreamCodec;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamCodec for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let end = input.iter().position(|&c| c == b'>').unwrap_or(input.len());
        let mut output = Vec::with_capacity(end / 2);
        let mut digits = input[..end].iter().filter(|&&c| !crate::lexer::is_whitespace(c));

        while let Some(&high) = digits.next() {
            let low = digits.next().copied().unwrap_or(b'0');

            let high_nibble = hex_digit_to_value(high).ok_or_else(|| {
                Error::Decode(format!("ASCIIHexDecode: invalid hex digit '{}'", high as char))
            })?;
            let low_nibble = hex_digit_to_value(low).ok_or_else(|| {
                Error::Decode(format!("ASCIIHexDecode: invalid hex digit '{}'", low as char))
            })?;

            output.push((high_nibble << 4) | low_nibble);
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let mut output = Vec::with_capacity(input.len() * 2 + input.len() / 32 + 1);

        for (i, &byte) in input.iter().enumerate() {
            if i > 0 && i % 32 == 0 {
                output.push(b'\n');
            }
            output.push(HEX[(byte >> 4) as usize]);
            output.push(HEX[(byte & 0x0F) as usize]);
        }
        output.push(b'>');

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

fn hex_digit_to_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
