//! RunLengthDecode implementation.
//!
//! A length byte 0-127 copies the next length+1 bytes literally, 129-255
//! repeats the next byte 257-length times, and 128 ends the data.

use crate::decoders::StreamCodec;
use crate::error::{Error, Result};

/// RunLengthDecode filter implementation.
pub struct RunLengthDecoder;

impl StreamCodec for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    if i + count > input.len() {
                        return Err(Error::Decode(format!(
                            "RunLengthDecode: not enough data for literal run (need {}, have {})",
                            count,
                            input.len() - i
                        )));
                    }
                    output.extend_from_slice(&input[i..i + count]);
                    i += count;
                },
                128 => break,
                129..=255 => {
                    let byte = *input
                        .get(i)
                        .ok_or_else(|| Error::Decode("RunLengthDecode: missing byte for run".to_string()))?;
                    i += 1;
                    output.resize(output.len() + 257 - length as usize, byte);
                },
            }
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() + input.len() / 128 + 2);
        let mut literal: Vec<u8> = Vec::with_capacity(128);
        let mut i = 0;

        let flush = |literal: &mut Vec<u8>, output: &mut Vec<u8>| {
            if !literal.is_empty() {
                output.push((literal.len() - 1) as u8);
                output.append(literal);
            }
        };

        while i < input.len() {
            let byte = input[i];
            let run = input[i..].iter().take(128).take_while(|&&b| b == byte).count();

            if run >= 2 {
                flush(&mut literal, &mut output);
                output.push((257 - run) as u8);
                output.push(byte);
                i += run;
            } else {
                literal.push(byte);
                if literal.len() == 128 {
                    flush(&mut literal, &mut output);
                }
                i += 1;
            }
        }
        flush(&mut literal, &mut output);
        output.push(128);

        Ok(output)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}
