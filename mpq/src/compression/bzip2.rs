//! bzip2 decompression

use super::{CompressionMethod, Decompressor};
use crate::{Error, Result};
use bzip2::read::BzDecoder;
use std::io::Read;

/// Largest output buffer reserved before any data is decoded
const MAX_PREALLOC: usize = 1 << 20;

/// bzip2 decoder backed by the `bzip2` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct Bzip2Decompressor;

impl Decompressor for Bzip2Decompressor {
    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let decoder = BzDecoder::new(data);
        let mut decompressed = Vec::with_capacity(expected_size.min(MAX_PREALLOC));

        // One byte past the expected size is enough to detect an oversized stream
        decoder
            .take((expected_size as u64).saturating_add(1))
            .read_to_end(&mut decompressed)
            .map_err(|e| Error::compression(format!("BZip2 decompression failed: {}", e)))?;

        if decompressed.len() > expected_size {
            return Err(Error::compression(format!(
                "BZip2: output exceeds the expected {} bytes",
                expected_size
            )));
        }
        if decompressed.len() != expected_size {
            return Err(Error::compression(format!(
                "BZip2: expected {} bytes, got {}",
                expected_size,
                decompressed.len()
            )));
        }

        Ok(decompressed)
    }

    fn method(&self) -> CompressionMethod {
        CompressionMethod::BZip2
    }
}
