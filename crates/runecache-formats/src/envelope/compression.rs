//! Gzip and headerless bzip2 backends

use super::error::{EnvelopeError, EnvelopeResult};
use bzip2::read::{BzDecoder, BzEncoder};
use flate2::read::{GzDecoder, GzEncoder};
use std::io::Read;

/// bzip2 stream magic for block size 1, omitted from stored payloads
pub const BZIP2_HEADER: &[u8; 4] = b"BZh1";

/// Upper bound on the buffer reserved up front for decompressed output
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Compression applied to an envelope payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
    /// Stored as-is
    None = 0,
    /// bzip2 with the `BZh1` magic stripped
    Bzip2 = 1,
    /// gzip
    Gzip = 2,
}

impl Compression {
    /// Parse a compression tag
    pub fn from_tag(tag: u8) -> EnvelopeResult<Self> {
        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Bzip2),
            2 => Ok(Self::Gzip),
            other => Err(EnvelopeError::IllegalCompressionType(other)),
        }
    }

    /// Wire tag
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Size of the decompressed-length prefix that follows the header
    pub const fn prefix_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Bzip2 | Self::Gzip => 4,
        }
    }
}

impl TryFrom<u8> for Compression {
    type Error = EnvelopeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}

/// Compress `data`. The returned bytes exclude any length prefix.
pub fn compress(data: &[u8], compression: Compression) -> EnvelopeResult<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(data, flate2::Compression::default());
            let mut compressed = Vec::new();
            encoder
                .read_to_end(&mut compressed)
                .map_err(|e| EnvelopeError::Compression(format!("gzip compression failed: {e}")))?;
            Ok(compressed)
        }
        Compression::Bzip2 => {
            let mut encoder = BzEncoder::new(data, bzip2::Compression::new(1));
            let mut compressed = Vec::new();
            encoder.read_to_end(&mut compressed).map_err(|e| {
                EnvelopeError::Compression(format!("bzip2 compression failed: {e}"))
            })?;
            if !compressed.starts_with(BZIP2_HEADER) {
                return Err(EnvelopeError::Compression(
                    "bzip2 stream is missing its block size 1 header".to_string(),
                ));
            }
            compressed.drain(..BZIP2_HEADER.len());
            Ok(compressed)
        }
    }
}

/// Decompress `data`, producing at most `expected_len + 1` bytes so an
/// oversized stream is reported as a length mismatch instead of being
/// inflated in full.
pub fn decompress(
    data: &[u8],
    compression: Compression,
    expected_len: usize,
) -> EnvelopeResult<Vec<u8>> {
    let limit = expected_len as u64 + 1;
    let mut decompressed = Vec::with_capacity(expected_len.min(MAX_PREALLOCATION));
    match compression {
        Compression::None => return Ok(data.to_vec()),
        Compression::Gzip => {
            GzDecoder::new(data)
                .take(limit)
                .read_to_end(&mut decompressed)
                .map_err(|e| {
                    EnvelopeError::Decompression(format!("gzip decompression failed: {e}"))
                })?;
        }
        Compression::Bzip2 => {
            let stream = BZIP2_HEADER.as_slice().chain(data);
            BzDecoder::new(stream)
                .take(limit)
                .read_to_end(&mut decompressed)
                .map_err(|e| {
                    EnvelopeError::Decompression(format!("bzip2 decompression failed: {e}"))
                })?;
        }
    }
    Ok(decompressed)
}
