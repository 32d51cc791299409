//! Envelope error types

use crate::cursor::CursorError;
use thiserror::Error;

/// Envelope codec error type
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Compressed length field outside the accepted range
    #[error("compressed length {length} out of bounds (max {max})")]
    CompressedLengthOutOfBounds {
        /// Length read from the envelope header
        length: u32,
        /// Largest accepted length
        max: u32,
    },

    /// Unknown compression tag
    #[error("illegal compression type: {0}")]
    IllegalCompressionType(u8),

    /// Version trailer holds the -1 tombstone
    #[error("illegal version: {0}")]
    IllegalVersion(i16),

    /// Decompressed size differs from the length prefix
    #[error("decompressed length mismatch: expected {expected}, got {actual}")]
    CompressionLengthMismatch {
        /// Length recorded in the envelope
        expected: usize,
        /// Length actually produced
        actual: usize,
    },

    /// Decompression failed
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Compression failed
    #[error("compression error: {0}")]
    Compression(String),

    /// Payload too large to describe in the envelope header
    #[error("payload of {0} bytes is too large for an envelope")]
    PayloadTooLarge(usize),

    /// Cursor error while reading the envelope
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Result type for envelope operations
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;
