//! Stream codecs for PDF filters.
//!
//! This module provides codecs for the PDF compression and encoding filters:
//! - FlateDecode (zlib/deflate) - most common
//! - ASCIIHexDecode - hexadecimal encoding
//! - ASCII85Decode - base85 encoding
//! - LZWDecode - LZW compression
//! - RunLengthDecode - run-length encoding
//! - DCTDecode - JPEG (pass-through)
//!
//! Codecs are chained into a filter pipeline. Decoding applies the chain in
//! order; encoding applies it in reverse. A filter the engine does not know
//! stops decoding without failing: the bytes decoded so far are returned
//! together with the filters still outstanding, so callers can copy the
//! stream through unchanged.

use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;

mod ascii85;
mod ascii_hex;
mod dct;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii_hex::AsciiHexDecoder;
pub use ascii85::Ascii85Decoder;
pub use dct::DctDecoder;
pub use flate::FlateDecoder;
pub use lzw::LzwDecoder;
pub use predictor::{decode_predictor, encode_predictor, DecodeParams, PngPredictor};
pub use runlength::RunLengthDecoder;

/// PDF stream filter types the engine can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// FlateDecode (deflate/zlib compression)
    FlateDecode,
    /// ASCIIHexDecode (hexadecimal encoding)
    ASCIIHexDecode,
    /// ASCII85Decode (base-85 encoding)
    ASCII85Decode,
    /// LZWDecode (Lempel-Ziv-Welch compression)
    LZWDecode,
    /// RunLengthDecode (run-length encoding)
    RunLengthDecode,
    /// DCTDecode (JPEG compression)
    DCTDecode,
}

impl Filter {
    /// Look up a filter by its PDF name, accepting inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            _ => None,
        }
    }

    /// Canonical PDF name.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::FlateDecode => "FlateDecode",
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::DCTDecode => "DCTDecode",
        }
    }

    /// ASCII armouring filters that only inflate the data.
    pub fn is_ascii(&self) -> bool {
        matches!(self, Filter::ASCIIHexDecode | Filter::ASCII85Decode)
    }

    /// Whether the filter's decode parameters may carry a predictor stage.
    pub fn uses_predictor(&self) -> bool {
        matches!(self, Filter::FlateDecode | Filter::LZWDecode)
    }

    /// Build the codec for this filter.
    pub fn codec(&self, params: Option<&DecodeParams>) -> Box<dyn StreamCodec> {
        match self {
            Filter::FlateDecode => Box::new(FlateDecoder),
            Filter::ASCIIHexDecode => Box::new(AsciiHexDecoder),
            Filter::ASCII85Decode => Box::new(Ascii85Decoder),
            Filter::LZWDecode => Box::new(LzwDecoder {
                early_change: params.map(|p| p.early_change != 0).unwrap_or(true),
            }),
            Filter::RunLengthDecode => Box::new(RunLengthDecoder),
            Filter::DCTDecode => Box::new(DctDecoder),
        }
    }
}

/// Trait for PDF stream codecs.
///
/// Each codec implements a specific PDF filter algorithm in both directions.
pub trait StreamCodec: Send + Sync {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Encode the input data so that `decode` restores it.
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this codec (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Result of running a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStream {
    /// Bytes after every filter that could be applied
    pub data: Vec<u8>,
    /// Filters not applied, starting with the first unsupported one
    pub remaining_filters: Vec<String>,
}

impl DecodedStream {
    /// True when the whole chain was decoded.
    pub fn is_complete(&self) -> bool {
        self.remaining_filters.is_empty()
    }

    /// Fully decoded bytes, or `UnsupportedFilter` naming the blocking filter.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.remaining_filters.into_iter().next() {
            None => Ok(self.data),
            Some(name) => Err(Error::UnsupportedFilter(name)),
        }
    }
}

/// Decode stream data using a filter pipeline.
///
/// Fails with `UnsupportedFilter` if the chain contains an unknown filter.
///
/// # Examples
///
/// ```
/// use pdf_press::decoders::decode_stream;
///
/// let decoded = decode_stream(b"48656C6C6F>", &["ASCIIHexDecode".to_string()]).unwrap();
/// assert_eq!(decoded, b"Hello");
/// ```
pub fn decode_stream(data: &[u8], filters: &[String]) -> Result<Vec<u8>> {
    decode_stream_with_options(data, filters, &[], &ParserOptions::default())?.into_result()
}

/// Decode stream data with per-filter parameters and decompression limits.
///
/// `params` is matched to `filters` by position; missing entries mean
/// defaults. Decoding stops at the first unknown filter.
///
/// # Security
///
/// This function includes decompression bomb protection:
/// - Checks the decompression ratio after each stage
/// - Checks the output size limit after each stage
pub fn decode_stream_with_options(
    data: &[u8],
    filters: &[String],
    params: &[Option<DecodeParams>],
    options: &ParserOptions,
) -> Result<DecodedStream> {
    let compressed_size = data.len();
    let mut current = data.to_vec();

    for (idx, filter_name) in filters.iter().enumerate() {
        let filter = match Filter::from_name(filter_name) {
            Some(f) => f,
            None => {
                log::warn!("Unsupported filter /{}, passing stream through", filter_name);
                return Ok(DecodedStream {
                    data: current,
                    remaining_filters: filters[idx..].to_vec(),
                });
            },
        };
        let filter_params = params.get(idx).and_then(Option::as_ref);

        current = filter.codec(filter_params).decode(&current)?;

        if let Some(p) = filter_params.filter(|p| filter.uses_predictor() && p.has_predictor()) {
            current = decode_predictor(&current, p)?;
        }

        check_limits(compressed_size, current.len(), options)?;
    }

    Ok(DecodedStream {
        data: current,
        remaining_filters: Vec::new(),
    })
}

/// Encode data so that decoding with `filters` yields it back.
///
/// Filters are applied last-to-first, each preceded by its predictor stage.
pub fn encode_stream(
    data: &[u8],
    filters: &[String],
    params: &[Option<DecodeParams>],
) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for (idx, filter_name) in filters.iter().enumerate().rev() {
        let filter = Filter::from_name(filter_name)
            .ok_or_else(|| Error::UnsupportedFilter(filter_name.clone()))?;
        let filter_params = params.get(idx).and_then(Option::as_ref);

        if let Some(p) = filter_params.filter(|p| filter.uses_predictor() && p.has_predictor()) {
            current = encode_predictor(&current, p)?;
        }
        current = filter.codec(filter_params).encode(&current)?;
    }

    Ok(current)
}

/// Zlib-compress `data` with the Flate codec.
pub fn flate_encode(data: &[u8]) -> Result<Vec<u8>> {
    FlateDecoder.encode(data)
}

fn check_limits(compressed_size: usize, decoded_size: usize, options: &ParserOptions) -> Result<()> {
    let max_ratio = options.max_decompression_ratio;
    if max_ratio > 0 && compressed_size > 0 {
        let ratio = decoded_size as u64 / compressed_size as u64;
        if ratio > max_ratio as u64 {
            return Err(Error::Decode(format!(
                "Decompression bomb detected: ratio {}:1 exceeds limit {}:1 (compressed: {} bytes, decompressed: {} bytes)",
                ratio, max_ratio, compressed_size, decoded_size
            )));
        }
    }

    let max_size = options.max_decompressed_size;
    if max_size > 0 && decoded_size > max_size {
        return Err(Error::Decode(format!(
            "Decompression bomb detected: decompressed size {} bytes exceeds limit {} bytes",
            decoded_size, max_size
        )));
    }

    Ok(())
}
