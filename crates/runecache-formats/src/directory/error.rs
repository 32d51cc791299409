//! Directory error types

use crate::cursor::CursorError;
use thiserror::Error;

/// Directory codec error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Unknown format selector byte
    #[error("illegal directory format type: {0}")]
    IllegalFormatType(u8),

    /// Value does not fit the integer width selected by the format
    #[error("value {value} does not fit the directory integer width (max {max})")]
    ValueOutOfRange {
        /// The offending value
        value: u32,
        /// Largest encodable value
        max: u32,
    },

    /// The same group id was produced twice by the delta sequence
    #[error("duplicate group id {0}")]
    DuplicateGroupId(u32),

    /// A name hash is missing while the flags ask for hashed names, or
    /// present while they do not
    #[error("name hash presence for group {group} (file {file:?}) does not match the directory flags")]
    InconsistentNameHash {
        /// Group id
        group: u32,
        /// File id, when the mismatch is on a file entry
        file: Option<u32>,
    },

    /// Cursor error while reading or writing
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;
