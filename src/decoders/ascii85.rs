//! ASCII85Decode implementation.
//!
//! Base-85 encoding: every 4 bytes become 5 characters in `!`..`u`, with
//! `z` standing for four zero bytes and `~>` marking end of data.

use crate::decoders::StreamCodec;
use crate::error::{Error, Result};

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

impl StreamCodec for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let body = input.strip_prefix(b"<~").unwrap_or(input);
        let mut output = Vec::with_capacity(body.len() * 4 / 5);
        let mut acc: u32 = 0;
        let mut count = 0;

        for &byte in body {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' must not appear in the middle of a group".to_string(),
                    ));
                },
                b'!'..=b'u' => {
                    acc = acc
                        .checked_mul(85)
                        .and_then(|v| v.checked_add((byte - b'!') as u32))
                        .ok_or_else(|| Error::Decode("ASCII85Decode: overflow in decoding".to_string()))?;
                    count += 1;

                    if count == 5 {
                        output.extend_from_slice(&acc.to_be_bytes());
                        acc = 0;
                        count = 0;
                    }
                },
                _ if crate::lexer::is_whitespace(byte) => {},
                _ => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character '{}'",
                        byte as char
                    )));
                },
            }
        }

        if count == 1 {
            return Err(Error::Decode(
                "ASCII85Decode: incomplete group (need at least 2 characters)".to_string(),
            ));
        }
        if count > 1 {
            for _ in count..5 {
                acc = acc
                    .checked_mul(85)
                    .and_then(|v| v.checked_add(84))
                    .ok_or_else(|| Error::Decode("ASCII85Decode: overflow in padding".to_string()))?;
            }
            output.extend_from_slice(&acc.to_be_bytes()[..count - 1]);
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 5 / 4 + 4);
        let mut line_len = 0;

        for chunk in input.chunks(4) {
            let mut group = [0u8; 4];
            group[..chunk.len()].copy_from_slice(chunk);
            let mut value = u32::from_be_bytes(group);

            if chunk.len() == 4 && value == 0 {
                output.push(b'z');
                line_len += 1;
            } else {
                let mut digits = [0u8; 5];
                for digit in digits.iter_mut().rev() {
                    *digit = (value % 85) as u8 + b'!';
                    value /= 85;
                }
                output.extend_from_slice(&digits[..chunk.len() + 1]);
                line_len += chunk.len() + 1;
            }

            if line_len >= 75 {
                output.push(b'\n');
                line_len = 0;
            }
        }
        output.extend_from_slice(b"~>");

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii85_decode_simple() {
        assert_eq!(Ascii85Decoder.decode(b"<+U,m").unwrap(), b"Test");
    }

    #[test]
    fn test_ascii85_decode_z_special_case() {
        assert_eq!(Ascii85Decoder.decode(b"zz").unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn test_ascii85_decode_with_markers_and_whitespace() {
        assert_eq!(Ascii85Decoder.decode(b"<~<+U ,m~>").unwrap(), b"Test");
    }

    #[test]
    fn test_ascii85_decode_invalid_character() {
        assert!(Ascii85Decoder.decode(b"Hello\x7f").is_err());
    }

    #[test]
    fn test_ascii85_decode_z_in_middle() {
        assert!(Ascii85Decoder.decode(b"!z").is_err());
    }

    #[test]
    fn test_ascii85_decode_single_char() {
        assert!(Ascii85Decoder.decode(b"!").is_err());
    }

    #[test]
    fn test_ascii85_encode_known_value() {
        assert_eq!(Ascii85Decoder.encode(b"Test").unwrap(), b"<+U,m~>");
    }

    #[test]
    fn test_ascii85_encode_partial_group_and_zeros() {
        let data = [0u8, 0, 0, 0, 1, 2, 3];
        let encoded = Ascii85Decoder.encode(&data).unwrap();
        assert_eq!(encoded[0], b'z');
        assert_eq!(Ascii85Decoder.decode(&encoded).unwrap(), data);
    }
}
