//! DCTDecode (JPEG) pass-through.
//!
//! JPEG data is copied unchanged in both directions; the engine never
//! rasterizes images, it only moves them between documents.

use crate::decoders::StreamCodec;
use crate::error::Result;

/// DCTDecode filter implementation.
pub struct DctDecoder;

impl StreamCodec for DctDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        if !input.starts_with(&[0xFF, 0xD8]) {
            log::debug!("DCTDecode data does not start with a JPEG SOI marker");
        }
        Ok(input.to_vec())
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        "DCTDecode"
    }
}
