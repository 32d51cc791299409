//! Storage engine for the runecache block-chained cache format.
//!
//! A cache directory holds one data file made of fixed-size blocks, one
//! index file per archive, and a master index file. Each index record points
//! at a chain of blocks in the data file; the master index points at every
//! archive's compressed directory.
//!
//! # Storage Layout
//!
//! ```text
//! main_file_cache.dat2       data blocks (520 bytes each by default)
//! main_file_cache.idx0..N    per-archive 6-byte pointer records
//! main_file_cache.idx255     master index (one record per archive)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use runecache_storage::{CacheConfig, Engine};
//!
//! # fn example() -> runecache_storage::Result<()> {
//! let config = CacheConfig::new("/path/to/cache").with_ciphered_archive(5);
//! let mut engine = Engine::open(config)?;
//! engine.load_fully()?;
//!
//! if let Some(directory) = engine.directory(2) {
//!     println!("archive 2 has {} groups", directory.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use runecache_crypto::CryptoError;
use runecache_formats::{CursorError, DirectoryError, EnvelopeError, GroupFileError};
use thiserror::Error;

// Archive state
pub mod archive;

// Block chain reader and writer
pub mod block;

// Configuration
pub mod config;

// Cache file discovery
pub mod discovery;

// Engine facade
pub mod engine;

// Group locator
pub mod group;

// Master directory bootstrap
pub mod master;

pub use archive::{Archive, LoadState};
pub use block::{BlockHeader, BlockPointer, RawPayload};
pub use config::CacheConfig;
pub use discovery::{CacheHandles, CachePaths};
pub use engine::Engine;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration failed validation.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// No cache directory configured.
    #[error("Cache directory not set")]
    DirectoryNotSet,

    /// Data file missing from the cache directory.
    #[error("Data file not found")]
    DataFileNotFound,

    /// Master index file missing from the cache directory.
    #[error("Master index file not found")]
    MasterIndexFileNotFound,

    /// No archive index files in the cache directory.
    #[error("No index files found")]
    NoIndexFilesFound,

    /// Directories requested before the master bootstrap ran.
    #[error("Directories not loaded")]
    DirectoriesNotLoaded,

    /// Archives requested before they were created.
    #[error("Archives not loaded")]
    ArchivesNotLoaded,

    /// Directories were already set.
    #[error("Directories already set")]
    DirectoriesAlreadySet,

    /// Archives were already set.
    #[error("Archives already set")]
    ArchivesAlreadySet,

    /// Archive id is unknown.
    #[error("Archive {0} does not exist")]
    ArchiveDoesNotExist(u8),

    /// Group id is not listed in the archive's directory.
    #[error("Group {group} does not exist in archive {archive}")]
    GroupDoesNotExist {
        /// Archive id
        archive: u8,
        /// Group id
        group: u32,
    },

    /// Block pointer length is zero or does not fit 3 bytes.
    #[error("Invalid block pointer length")]
    InvalidPointerLength,

    /// Block pointer offset is zero or does not fit 3 bytes.
    #[error("Invalid block pointer offset")]
    InvalidPointerOffset,

    /// Index record could not be read in full.
    #[error("Malformed index read: expected {expected} bytes, got {actual}")]
    MalformedIndexRead {
        /// Record width
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// Data block could not be read in full.
    #[error("Malformed block read: expected {expected} bytes, got {actual}")]
    BlockReadMalformed {
        /// Header plus payload chunk size
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// Block belongs to another archive.
    #[error("Block archive mismatch: expected {expected}, got {actual}")]
    ArchiveMismatch {
        /// Requested archive id
        expected: u8,
        /// Archive id in the block header
        actual: u8,
    },

    /// Block belongs to another group.
    #[error("Block group mismatch: expected {expected}, got {actual}")]
    GroupMismatch {
        /// Requested group id
        expected: u32,
        /// Group id in the block header
        actual: u32,
    },

    /// Block is out of sequence.
    #[error("Block index mismatch: expected {expected}, got {actual}")]
    BlockMismatch {
        /// Position in the chain
        expected: u16,
        /// Block index in the header
        actual: u16,
    },

    /// Group envelope checksum differs from the directory entry.
    #[error("Group {group} of archive {archive} has crc {actual:08x}, expected {expected:08x}")]
    CrcMismatch {
        /// Archive id
        archive: u8,
        /// Group id
        group: u32,
        /// Checksum recorded in the directory
        expected: u32,
        /// Checksum of the stored envelope
        actual: u32,
    },

    /// Group id needs an extended block header.
    #[error("Group {0} does not fit a 2-byte block header")]
    GroupIdTooWide(u32),

    /// Fixed-layout record codec error.
    #[error("Binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    /// Envelope codec error.
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Directory codec error.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Group file splitting error.
    #[error("Group file error: {0}")]
    GroupFiles(#[from] GroupFileError),

    /// Cursor error.
    #[error("Cursor error: {0}")]
    Cursor(#[from] CursorError),

    /// Key construction error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
