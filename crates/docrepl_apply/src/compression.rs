//! Transparent gzip handling of document payloads.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use thiserror::Error;

/// gzip magic bytes for compression detection.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors produced while decompressing a payload.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The gzip stream is corrupt or truncated.
    #[error("gzip decode: {0}")]
    Gzip(#[from] io::Error),

    /// The decompressed payload exceeds the configured limit.
    #[error("decompressed payload exceeds limit of {limit} bytes")]
    TooLarge {
        /// Configured limit.
        limit: u64,
    },
}

/// Returns true if `data` starts with the gzip magic header.
#[must_use]
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Decompresses gzip data if it has the magic header, otherwise returns it as-is.
///
/// # Errors
///
/// Fails on a corrupt gzip stream, or when the output would exceed `limit`
/// bytes.
pub fn maybe_decompress(data: &[u8], limit: u64) -> Result<Vec<u8>, CompressionError> {
    if !is_gzip(data) {
        if data.len() as u64 > limit {
            return Err(CompressionError::TooLarge { limit });
        }
        return Ok(data.to_vec());
    }

    let mut decompressed = Vec::new();
    GzDecoder::new(data)
        .take(limit.saturating_add(1))
        .read_to_end(&mut decompressed)?;
    if decompressed.len() as u64 > limit {
        return Err(CompressionError::TooLarge { limit });
    }
    Ok(decompressed)
}

/// Compresses `data` with gzip.
///
/// # Errors
///
/// Fails only if the encoder fails to write to memory.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
