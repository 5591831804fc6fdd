//! PNG and TIFF predictors for Flate/LZW streams.
//!
//! PDF streams can use predictors to improve compression. The predictor
//! encodes differences between adjacent samples, which are reversed after
//! the compression filter has been undone.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.4.4 - LZW and Flate Predictor Functions

use crate::error::{Error, Result};
use crate::object::{Dict, Object};

/// PNG predictor algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngPredictor {
    /// No prediction (predictor 10)
    None = 10,
    /// Sub: each byte is the difference from the byte to its left (predictor 11)
    Sub = 11,
    /// Up: each byte is the difference from the byte above (predictor 12)
    Up = 12,
    /// Average: each byte is the difference from the average of left and above (predictor 13)
    Average = 13,
    /// Paeth: uses a complex predictor function (predictor 14)
    Paeth = 14,
    /// Optimum: PNG allows different predictor per row (predictor 15)
    Optimum = 15,
}

/// Decode parameters for stream decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (width in samples)
    pub columns: usize,
    /// Number of color components per sample (default 1)
    pub colors: usize,
    /// Bits per component (default 8)
    pub bits_per_component: usize,
    /// LZW code width switch timing (default 1)
    pub early_change: i64,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
            early_change: 1,
        }
    }
}

impl DecodeParams {
    /// Read parameters from a `/DecodeParms` dictionary, applying defaults.
    pub fn from_dict(dict: &Dict) -> Self {
        let int = |key: &str, default: i64| dict.get(key).and_then(Object::as_integer).unwrap_or(default);

        Self {
            predictor: int("Predictor", 1),
            columns: int("Columns", 1).max(1) as usize,
            colors: int("Colors", 1).clamp(1, 32) as usize,
            bits_per_component: int("BitsPerComponent", 8).clamp(1, 16) as usize,
            early_change: int("EarlyChange", 1),
        }
    }

    /// Parameters for PNG Up prediction over rows of `columns` bytes.
    pub fn png_up(columns: usize) -> Self {
        Self {
            predictor: PngPredictor::Up as i64,
            columns,
            ..Default::default()
        }
    }

    /// Serialize the non-default entries back into a dictionary.
    pub fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        if self.predictor != 1 {
            dict.insert("Predictor".to_string(), Object::Integer(self.predictor));
            dict.insert("Columns".to_string(), Object::Integer(self.columns as i64));
            if self.colors != 1 {
                dict.insert("Colors".to_string(), Object::Integer(self.colors as i64));
            }
            if self.bits_per_component != 8 {
                dict.insert(
                    "BitsPerComponent".to_string(),
                    Object::Integer(self.bits_per_component as i64),
                );
            }
        }
        if self.early_change != 1 {
            dict.insert("EarlyChange".to_string(), Object::Integer(self.early_change));
        }
        dict
    }

    /// True when a predictor stage is configured.
    pub fn has_predictor(&self) -> bool {
        self.predictor > 1
    }

    /// Calculate the number of bytes per row (including the PNG tag byte).
    pub fn bytes_per_row(&self) -> usize {
        let pixel_bytes = self.pixel_bytes_per_row();

        if self.predictor >= 10 {
            pixel_bytes + 1
        } else {
            pixel_bytes
        }
    }

    /// Calculate the number of bytes of actual pixel data per row (without predictor tag).
    pub fn pixel_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes per complete pixel, at least one.
    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Reverse predictor encoding.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        p if p <= 1 => Ok(data.to_vec()),
        2 => decode_tiff_predictor(data, params),
        10..=15 => decode_png_predictor(data, params),
        _ => Err(Error::Decode(format!("Unsupported predictor: {}", params.predictor))),
    }
}

/// Apply predictor encoding ahead of compression.
///
/// PNG predictors 10-15 all write per-row tags; rows are encoded with the
/// algorithm named by the predictor value, with 15 (Optimum) using Up.
pub fn encode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        p if p <= 1 => Ok(data.to_vec()),
        2 => encode_tiff_predictor(data, params),
        10..=15 => encode_png_predictor(data, params),
        _ => Err(Error::Decode(format!("Unsupported predictor: {}", params.predictor))),
    }
}

/// Decode TIFF Predictor 2.
///
/// Only 8-bit components are supported; other depths pass through unchanged.
fn decode_tiff_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        log::warn!(
            "TIFF predictor with {} bits per component not supported, passing through",
            params.bits_per_component
        );
        return Ok(data.to_vec());
    }

    let bytes_per_row = params.pixel_bytes_per_row();
    let colors = params.colors;
    let mut output = Vec::with_capacity(data.len());

    for row in data.chunks(bytes_per_row) {
        let start = output.len();
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= colors { output[start + i - colors] } else { 0 };
            output.push(byte.wrapping_add(left));
        }
    }

    Ok(output)
}

fn encode_tiff_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor encoding needs 8 bits per component, got {}",
            params.bits_per_component
        )));
    }

    let bytes_per_row = params.pixel_bytes_per_row();
    let colors = params.colors;
    let mut output = Vec::with_capacity(data.len());

    for row in data.chunks(bytes_per_row) {
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= colors { row[i - colors] } else { 0 };
            output.push(byte.wrapping_sub(left));
        }
    }

    Ok(output)
}

/// Decode PNG predictors (10-15).
///
/// Every row starts with a tag byte naming the algorithm for that row.
/// A truncated trailing row is dropped.
fn decode_png_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let bytes_per_row = params.bytes_per_row();
    let pixel_bytes = params.pixel_bytes_per_row();
    let bpp = params.bytes_per_pixel();

    if !data.len().is_multiple_of(bytes_per_row) {
        log::warn!(
            "Predictor data length {} is not a multiple of row size {}, dropping partial row",
            data.len(),
            bytes_per_row
        );
    }

    let row_count = data.len() / bytes_per_row;
    let mut output = Vec::with_capacity(row_count * pixel_bytes);
    let mut prev_row = vec![0u8; pixel_bytes];

    for row_data in data.chunks_exact(bytes_per_row) {
        let tag = row_data[0];
        let encoded = &row_data[1..];
        let mut row = vec![0u8; pixel_bytes];

        for i in 0..pixel_bytes {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            let pred = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth_predictor(left, up, up_left),
                _ => return Err(Error::Decode(format!("Invalid PNG predictor tag: {}", tag))),
            };
            row[i] = encoded[i].wrapping_add(pred);
        }

        output.extend_from_slice(&row);
        prev_row = row;
    }

    Ok(output)
}

fn encode_png_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let pixel_bytes = params.pixel_bytes_per_row();
    let bpp = params.bytes_per_pixel();
    let tag = match params.predictor {
        15 => 2,
        p => (p - 10) as u8,
    };

    let mut output = Vec::with_capacity(data.len() + data.len() / pixel_bytes.max(1) + 1);
    let mut prev_row = vec![0u8; pixel_bytes];

    for chunk in data.chunks(pixel_bytes) {
        let mut row = chunk.to_vec();
        row.resize(pixel_bytes, 0);

        output.push(tag);
        for i in 0..pixel_bytes {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            let pred = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                _ => paeth_predictor(left, up, up_left),
            };
            output.push(row[i].wrapping_sub(pred));
        }

        prev_row = row;
    }

    Ok(output)
}

/// Paeth predictor function from PNG specification.
fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let (a16, b16, c16) = (a as i16, b as i16, c as i16);
    let p = a16 + b16 - c16;
    let pa = (p - a16).abs();
    let pb = (p - b16).abs();
    let pc = (p - c16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_predictor() {
        let data = b"Hello, World!";
        let result = decode_predictor(data, &DecodeParams::default()).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_png_up_predictor() {
        let params = DecodeParams::png_up(5);

        // Each row: tag 2 (Up) followed by differences from the row above
        let encoded = vec![
            2, 10, 20, 30, 40, 50, //
            2, 5, 5, 5, 5, 5,
        ];

        let result = decode_predictor(&encoded, &params).unwrap();
        assert_eq!(result, vec![10, 20, 30, 40, 50, 15, 25, 35, 45, 55]);
    }

    #[test]
    fn test_png_encode_up_matches_decoder() {
        let params = DecodeParams::png_up(4);
        let data: Vec<u8> = (0..40u8).map(|b| b.wrapping_mul(7)).collect();

        let encoded = encode_predictor(&data, &params).unwrap();
        assert_eq!(encoded.len(), 50);
        assert_eq!(encoded[0], 2);
        assert_eq!(decode_predictor(&encoded, &params).unwrap(), data);
    }

    #[test]
    fn test_png_paeth_rows() {
        let params = DecodeParams {
            predictor: 14,
            columns: 3,
            colors: 1,
            ..Default::default()
        };
        let data = vec![1, 2, 3, 4, 5, 6, 9, 9, 9];
        let encoded = encode_predictor(&data, &params).unwrap();
        assert!(encoded.chunks(4).all(|row| row[0] == 4));
        assert_eq!(decode_predictor(&encoded, &params).unwrap(), data);
    }

    #[test]
    fn test_png_partial_row_dropped() {
        let params = DecodeParams::png_up(2);
        let result = decode_predictor(&[0, 1, 2, 0, 9], &params).unwrap();
        assert_eq!(result, vec![1, 2]);
    }

    #[test]
    fn test_png_invalid_tag() {
        let params = DecodeParams::png_up(2);
        assert!(decode_predictor(&[7, 1, 2], &params).is_err());
    }

    #[test]
    fn test_tiff_predictor_rgb() {
        let params = DecodeParams {
            predictor: 2,
            columns: 2,
            colors: 3,
            ..Default::default()
        };
        let data = vec![10, 20, 30, 15, 25, 35];
        let encoded = encode_predictor(&data, &params).unwrap();
        assert_eq!(encoded, vec![10, 20, 30, 5, 5, 5]);
        assert_eq!(decode_predictor(&encoded, &params).unwrap(), data);
    }

    #[test]
    fn test_bytes_per_row_calculation() {
        let params = DecodeParams::png_up(5);
        assert_eq!(params.bytes_per_row(), 6);
        assert_eq!(params.pixel_bytes_per_row(), 5);
    }

    #[test]
    fn test_params_dict_round_trip() {
        let params = DecodeParams::png_up(7);
        assert_eq!(DecodeParams::from_dict(&params.to_dict()), params);
        assert!(DecodeParams::default().to_dict().is_empty());
    }
}
