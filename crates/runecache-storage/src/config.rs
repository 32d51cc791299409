//! Configuration for the cache engine

use crate::block::{EXTENDED_HEADER_LEN, POINTER_LEN};
use crate::{Result, StorageError};
use runecache_formats::envelope::DEFAULT_MAX_COMPRESSED_LENGTH;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default name of the data file
pub const DEFAULT_DATA_FILE_NAME: &str = "main_file_cache.dat2";

/// Default prefix of index file names
pub const DEFAULT_INDEX_FILE_PREFIX: &str = "main_file_cache";

/// Default marker separating an index file name from its archive id
pub const DEFAULT_INDEX_FILE_SUFFIX: &str = ".idx";

/// Default archive id of the master index
pub const DEFAULT_MASTER_INDEX_ID: u8 = 255;

/// Default size of an index record
pub const DEFAULT_INDEX_BLOCK_LENGTH: usize = POINTER_LEN;

/// Default size of a data block
pub const DEFAULT_DATA_BLOCK_LENGTH: usize = 520;

/// Configuration for the cache engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the cache files
    pub directory: PathBuf,

    /// Name of the data file
    pub data_file_name: String,

    /// Prefix every index file name starts with
    pub index_file_prefix: String,

    /// Marker followed by the archive id in index file names
    pub index_file_suffix: String,

    /// Archive id of the master index
    pub master_index_id: u8,

    /// Size of an index record in bytes
    pub index_block_length: usize,

    /// Size of a data block in bytes
    pub data_block_length: usize,

    /// Largest accepted envelope compressed length
    pub max_compressed_length: u32,

    /// Archives whose groups need XTEA keys and are skipped by eager loads
    pub ciphered_archives: BTreeSet<u8>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            data_file_name: DEFAULT_DATA_FILE_NAME.to_string(),
            index_file_prefix: DEFAULT_INDEX_FILE_PREFIX.to_string(),
            index_file_suffix: DEFAULT_INDEX_FILE_SUFFIX.to_string(),
            master_index_id: DEFAULT_MASTER_INDEX_ID,
            index_block_length: DEFAULT_INDEX_BLOCK_LENGTH,
            data_block_length: DEFAULT_DATA_BLOCK_LENGTH,
            max_compressed_length: DEFAULT_MAX_COMPRESSED_LENGTH,
            ciphered_archives: BTreeSet::new(),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration for the given cache directory
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the structural parameters
    pub fn validate(&self) -> Result<()> {
        if self.index_block_length < POINTER_LEN {
            return Err(StorageError::InvalidConfig(format!(
                "index block length {} is smaller than a {POINTER_LEN}-byte pointer record",
                self.index_block_length
            )));
        }
        if self.data_block_length <= EXTENDED_HEADER_LEN {
            return Err(StorageError::InvalidConfig(format!(
                "data block length {} leaves no room after a {EXTENDED_HEADER_LEN}-byte header",
                self.data_block_length
            )));
        }
        if self.index_file_suffix.is_empty() {
            return Err(StorageError::InvalidConfig(
                "index file suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `archive` is ciphered
    pub fn is_ciphered(&self, archive: u8) -> bool {
        self.ciphered_archives.contains(&archive)
    }

    /// Set the cache directory
    #[must_use]
    pub fn with_directory<P: AsRef<Path>>(mut self, directory: P) -> Self {
        self.directory = directory.as_ref().to_path_buf();
        self
    }

    /// Set the data file name
    #[must_use]
    pub fn with_data_file_name(mut self, name: impl Into<String>) -> Self {
        self.data_file_name = name.into();
        self
    }

    /// Set the index file prefix
    #[must_use]
    pub fn with_index_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_file_prefix = prefix.into();
        self
    }

    /// Set the index file suffix
    #[must_use]
    pub fn with_index_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.index_file_suffix = suffix.into();
        self
    }

    /// Set the master index archive id
    #[must_use]
    pub const fn with_master_index_id(mut self, id: u8) -> Self {
        self.master_index_id = id;
        self
    }

    /// Set the index record size
    #[must_use]
    pub const fn with_index_block_length(mut self, length: usize) -> Self {
        self.index_block_length = length;
        self
    }

    /// Set the data block size
    #[must_use]
    pub const fn with_data_block_length(mut self, length: usize) -> Self {
        self.data_block_length = length;
        self
    }

    /// Set the largest accepted compressed length
    #[must_use]
    pub const fn with_max_compressed_length(mut self, length: u32) -> Self {
        self.max_compressed_length = length;
        self
    }

    /// Mark an archive as ciphered
    #[must_use]
    pub fn with_ciphered_archive(mut self, archive: u8) -> Self {
        self.ciphered_archives.insert(archive);
        self
    }

    /// Mark several archives as ciphered
    #[must_use]
    pub fn with_ciphered_archives<I: IntoIterator<Item = u8>>(mut self, archives: I) -> Self {
        self.ciphered_archives.extend(archives);
        self
    }
}
