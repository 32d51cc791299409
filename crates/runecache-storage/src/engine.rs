//! Engine facade tying the cache files, directories and decoded groups together

use crate::archive::{Archive, LoadState};
use crate::config::CacheConfig;
use crate::discovery::CacheHandles;
use crate::group::locate_group;
use crate::master;
use crate::{Result, StorageError};
use runecache_crypto::XteaKey;
use runecache_formats::{ByteCursor, Directory, Envelope, Group, split_group_files};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek};
use tracing::{debug, info};

/// Cache engine.
///
/// Owns the open cache files, the directories read from the master index and
/// the groups decoded so far. Directories and archives are each set once;
/// groups are decoded on demand or all at once.
#[derive(Debug)]
pub struct Engine<F = File> {
    config: CacheConfig,
    handles: CacheHandles<F>,
    directories: LoadState<BTreeMap<u8, Directory>>,
    archives: LoadState<BTreeMap<u8, Archive>>,
    index_scratch: Vec<u8>,
    data_scratch: Vec<u8>,
}

impl Engine<File> {
    /// Locate and open the cache files in the configured directory
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let handles = CacheHandles::discover(&config)?;
        info!(
            "Opened cache at {:?} with {} archive indexes",
            config.directory,
            handles.indexes.len()
        );
        Self::new(handles, config)
    }
}

impl<F: Read + Seek> Engine<F> {
    /// Create an engine over already-opened handles
    pub fn new(handles: CacheHandles<F>, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            index_scratch: vec![0; config.index_block_length],
            data_scratch: vec![0; config.data_block_length],
            config,
            handles,
            directories: LoadState::Unloaded,
            archives: LoadState::Unloaded,
        })
    }

    /// Engine configuration
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read the directory of every archive with an index file
    pub fn read_directories(&mut self) -> Result<BTreeMap<u8, Directory>> {
        let ids = self.handles.archive_ids();
        master::read_directories(
            &mut self.handles.data,
            &mut self.handles.master_index,
            &ids,
            &self.config,
            &mut self.data_scratch,
        )
    }

    /// Install the directories. Fails if they were already set.
    pub fn put_directories(&mut self, directories: BTreeMap<u8, Directory>) -> Result<()> {
        self.directories
            .set(directories)
            .map_err(|_| StorageError::DirectoriesAlreadySet)
    }

    /// Create one empty archive per loaded directory
    pub fn create_archives(&self) -> Result<BTreeMap<u8, Archive>> {
        let directories = self.directories()?;
        Ok(directories
            .keys()
            .map(|&id| (id, Archive::new(id)))
            .collect())
    }

    /// Install the archives. Fails if they were already set.
    pub fn put_archives(&mut self, archives: BTreeMap<u8, Archive>) -> Result<()> {
        self.archives
            .set(archives)
            .map_err(|_| StorageError::ArchivesAlreadySet)
    }

    /// Read and install the directories, then create and install the archives
    pub fn load_directories(&mut self) -> Result<()> {
        let directories = self.read_directories()?;
        self.put_directories(directories)?;
        let archives = self.create_archives()?;
        self.put_archives(archives)
    }

    /// Decode one group with `key` and return its files in directory order.
    ///
    /// The stored envelope must match the checksum in the archive's
    /// directory. A group decoded earlier is returned from memory without
    /// touching the cache files.
    pub fn load_group(&mut self, archive: u8, group: u32, key: &XteaKey) -> Result<&[Vec<u8>]> {
        let entry = self.directory_group(archive, group)?;
        let (file_count, expected_crc) = (entry.file_count(), entry.crc);
        let loaded = self
            .archives()?
            .get(&archive)
            .ok_or(StorageError::ArchiveDoesNotExist(archive))?
            .is_loaded(group);

        if !loaded {
            let files = self.decode_group(archive, group, file_count, expected_crc, key)?;
            debug!(
                "Loaded group {} of archive {} ({} files)",
                group,
                archive,
                files.len()
            );
            self.archive_mut(archive)?.groups.insert(group, files);
        }

        self.group_files(archive, group)
            .ok_or(StorageError::GroupDoesNotExist { archive, group })
    }

    /// Decode every group of every archive that is not ciphered
    pub fn load_all_groups(&mut self) -> Result<()> {
        let targets: Vec<(u8, u32)> = self
            .directories()?
            .iter()
            .filter(|(id, _)| !self.config.is_ciphered(**id))
            .flat_map(|(&id, directory)| directory.groups.keys().map(move |&group| (id, group)))
            .collect();
        self.archives()?;

        for &(archive, group) in &targets {
            self.load_group(archive, group, &XteaKey::ZERO)?;
        }

        info!("Loaded {} groups", targets.len());
        Ok(())
    }

    /// Load the directories and every non-ciphered group
    pub fn load_fully(&mut self) -> Result<()> {
        self.load_directories()?;
        self.load_all_groups()
    }

    /// Directory of an archive
    pub fn directory(&self, archive: u8) -> Option<&Directory> {
        self.directories.get()?.get(&archive)
    }

    /// Decoded state of an archive
    pub fn archive(&self, archive: u8) -> Option<&Archive> {
        self.archives.get()?.get(&archive)
    }

    /// Files of a decoded group
    pub fn group_files(&self, archive: u8, group: u32) -> Option<&[Vec<u8>]> {
        self.archive(archive)?.group(group)
    }

    /// One file of a decoded group, looked up by file id
    pub fn file(&self, archive: u8, group: u32, file: u32) -> Option<&[u8]> {
        let position = self.directory(archive)?.group(group)?.file_index(file)?;
        self.group_files(archive, group)?
            .get(position)
            .map(Vec::as_slice)
    }

    /// Release every file handle
    pub fn close(self) {
        debug!(
            "Closing cache with {} archive indexes",
            self.handles.indexes.len()
        );
        drop(self.handles);
    }

    fn directories(&self) -> Result<&BTreeMap<u8, Directory>> {
        self.directories
            .get()
            .ok_or(StorageError::DirectoriesNotLoaded)
    }

    fn archives(&self) -> Result<&BTreeMap<u8, Archive>> {
        self.archives.get().ok_or(StorageError::ArchivesNotLoaded)
    }

    fn archive_mut(&mut self, archive: u8) -> Result<&mut Archive> {
        self.archives
            .get_mut()
            .ok_or(StorageError::ArchivesNotLoaded)?
            .get_mut(&archive)
            .ok_or(StorageError::ArchiveDoesNotExist(archive))
    }

    fn directory_group(&self, archive: u8, group: u32) -> Result<&Group> {
        self.directories()?
            .get(&archive)
            .ok_or(StorageError::ArchiveDoesNotExist(archive))?
            .group(group)
            .ok_or(StorageError::GroupDoesNotExist { archive, group })
    }

    fn decode_group(
        &mut self,
        archive: u8,
        group: u32,
        file_count: usize,
        expected_crc: u32,
        key: &XteaKey,
    ) -> Result<Vec<Vec<u8>>> {
        let index = self
            .handles
            .indexes
            .get_mut(&archive)
            .ok_or(StorageError::ArchiveDoesNotExist(archive))?;

        let payload = locate_group(
            &mut self.handles.data,
            index,
            archive,
            group,
            &self.config,
            &mut self.index_scratch,
            &mut self.data_scratch,
        )?;

        let mut crc = crc32fast::Hasher::new();
        let envelope = Envelope::decode(
            &mut ByteCursor::new(&payload.data),
            key,
            self.config.max_compressed_length,
            &mut crc,
        )?;

        let actual = crc.finalize();
        if actual != expected_crc {
            return Err(StorageError::CrcMismatch {
                archive,
                group,
                expected: expected_crc,
                actual,
            });
        }

        Ok(split_group_files(&envelope.data, file_count)?)
    }
}
