//! Locating and opening cache files

use crate::config::CacheConfig;
use crate::{Result, StorageError};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Paths of the files making up a cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    /// Data file
    pub data: PathBuf,
    /// Master index file
    pub master_index: PathBuf,
    /// Archive index files keyed by archive id
    pub indexes: BTreeMap<u8, PathBuf>,
}

impl CachePaths {
    /// Scan the configured directory (non-recursively) for cache files.
    ///
    /// An index file is any file whose name starts with the index prefix and
    /// contains the index suffix; the archive id is the decimal number after
    /// the suffix.
    pub fn locate(config: &CacheConfig) -> Result<Self> {
        if config.directory.as_os_str().is_empty() {
            return Err(StorageError::DirectoryNotSet);
        }

        let mut data = None;
        let mut master_index = None;
        let mut indexes = BTreeMap::new();

        for entry in std::fs::read_dir(&config.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            if name == config.data_file_name {
                data = Some(path);
            } else if let Some(id) = index_id(name, config) {
                match id.parse::<u8>() {
                    Ok(id) if id == config.master_index_id => master_index = Some(path),
                    Ok(id) => {
                        debug!("Found index file {} for archive {}", name, id);
                        indexes.insert(id, path);
                    }
                    Err(e) => warn!("Skipping index file {:?}: {}", path, e),
                }
            }
        }

        let master_index = master_index.ok_or(StorageError::MasterIndexFileNotFound)?;
        let data = data.ok_or(StorageError::DataFileNotFound)?;
        if indexes.is_empty() {
            return Err(StorageError::NoIndexFilesFound);
        }

        Ok(Self {
            data,
            master_index,
            indexes,
        })
    }

    /// Open every file read-only
    pub fn open(&self) -> Result<CacheHandles<File>> {
        let indexes = self
            .indexes
            .iter()
            .map(|(&id, path)| Ok((id, File::open(path)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(CacheHandles {
            data: File::open(&self.data)?,
            master_index: File::open(&self.master_index)?,
            indexes,
        })
    }
}

fn index_id<'a>(name: &'a str, config: &CacheConfig) -> Option<&'a str> {
    if !name.starts_with(&config.index_file_prefix) {
        return None;
    }
    let at = name.find(&config.index_file_suffix)?;
    Some(&name[at + config.index_file_suffix.len()..])
}

/// Already-opened cache file handles, owned by the engine.
#[derive(Debug)]
pub struct CacheHandles<F> {
    /// Data file
    pub data: F,
    /// Master index file
    pub master_index: F,
    /// Archive index files keyed by archive id
    pub indexes: BTreeMap<u8, F>,
}

impl<F> CacheHandles<F> {
    /// Bundle handles opened elsewhere
    pub const fn new(data: F, master_index: F, indexes: BTreeMap<u8, F>) -> Self {
        Self {
            data,
            master_index,
            indexes,
        }
    }

    /// Archive ids with an index file, ascending
    pub fn archive_ids(&self) -> Vec<u8> {
        self.indexes.keys().copied().collect()
    }
}

impl CacheHandles<File> {
    /// Locate and open the cache files in the configured directory
    pub fn discover(config: &CacheConfig) -> Result<Self> {
        CachePaths::locate(config)?.open()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), []).unwrap();
    }

    #[test]
    fn test_locate() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "main_file_cache.dat2");
        touch(&dir, "main_file_cache.idx255");
        touch(&dir, "main_file_cache.idx0");
        touch(&dir, "main_file_cache.idx12");
        touch(&dir, "main_file_cache.idx300");
        touch(&dir, "main_file_cache.idxabc");
        touch(&dir, "readme.txt");
        fs::create_dir(dir.path().join("main_file_cache.idx7")).unwrap();

        let paths = CachePaths::locate(&CacheConfig::new(dir.path())).unwrap();
        assert_eq!(paths.data, dir.path().join("main_file_cache.dat2"));
        assert_eq!(paths.master_index, dir.path().join("main_file_cache.idx255"));
        assert_eq!(paths.indexes.keys().copied().collect::<Vec<_>>(), vec![0, 12]);

        let handles = paths.open().unwrap();
        assert_eq!(handles.archive_ids(), vec![0, 12]);
    }

    #[test]
    fn test_directory_not_set() {
        assert!(matches!(
            CachePaths::locate(&CacheConfig::default()),
            Err(StorageError::DirectoryNotSet)
        ));
    }

    #[test]
    fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::new(dir.path());
        assert!(matches!(
            CacheHandles::discover(&config),
            Err(StorageError::MasterIndexFileNotFound)
        ));

        touch(&dir, "main_file_cache.idx255");
        assert!(matches!(
            CacheHandles::discover(&config),
            Err(StorageError::DataFileNotFound)
        ));

        touch(&dir, "main_file_cache.dat2");
        assert!(matches!(
            CacheHandles::discover(&config),
            Err(StorageError::NoIndexFilesFound)
        ));

        touch(&dir, "main_file_cache.idx2");
        let handles = CacheHandles::discover(&config).unwrap();
        assert_eq!(handles.archive_ids(), vec![2]);
    }

    #[test]
    fn test_custom_names() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "cache.data");
        touch(&dir, "cache-index.10");
        touch(&dir, "cache-index.3");

        let config = CacheConfig::new(dir.path())
            .with_data_file_name("cache.data")
            .with_index_file_prefix("cache-")
            .with_index_file_suffix("index.")
            .with_master_index_id(10);
        let paths = CachePaths::locate(&config).unwrap();
        assert_eq!(paths.master_index, dir.path().join("cache-index.10"));
        assert_eq!(paths.indexes.keys().copied().collect::<Vec<_>>(), vec![3]);
    }
}
