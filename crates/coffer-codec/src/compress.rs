//! LZ4 frame compression
//!
//! `decompress(compress(x)) == x` for all inputs; no level knob is exposed.

use coffer_common::{Error, Result};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::io::{Read, Write};

/// Compress bytes with the LZ4 frame format
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = FrameEncoder::new(Vec::new());
    encoder
        .write_all(data)
        .map_err(|e| Error::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::CompressionFailed(e.to_string()))
}

/// Decompress an LZ4 frame back to the original bytes
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = FrameDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
    Ok(out)
}
