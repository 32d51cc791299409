//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key size
    #[error("Invalid key size: expected {expected} words, got {actual}")]
    InvalidKeySize {
        /// Expected number of 32-bit key words
        expected: usize,
        /// Actual number of 32-bit key words
        actual: usize,
    },
}
