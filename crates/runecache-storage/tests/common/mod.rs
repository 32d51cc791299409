//! Synthetic cache builder shared by the integration tests

#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

use runecache_crypto::XteaKey;
use runecache_formats::{
    Compression, Directory, Envelope, FormatType, Group, GroupFile, encode_group_files,
};
use runecache_storage::block::{BlockHeader, BlockPointer, blocks_needed, encode_payload};
use runecache_storage::config::{DEFAULT_DATA_BLOCK_LENGTH, DEFAULT_MASTER_INDEX_ID};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BLOCK_LEN: usize = DEFAULT_DATA_BLOCK_LENGTH;

/// One group to store
pub struct StoredGroup {
    pub id: u32,
    pub files: Vec<(u32, Vec<u8>)>,
    pub compression: Compression,
    pub key: XteaKey,
}

impl StoredGroup {
    pub fn new(id: u32, files: Vec<(u32, Vec<u8>)>) -> Self {
        Self {
            id,
            files,
            compression: Compression::Gzip,
            key: XteaKey::ZERO,
        }
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn key(mut self, key: XteaKey) -> Self {
        self.key = key;
        self
    }
}

/// A cache written to a temporary directory
pub struct Fixture {
    pub dir: TempDir,
    pub directories: BTreeMap<u8, Directory>,
    pub pointers: BTreeMap<(u8, u32), BlockPointer>,
}

impl Fixture {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("main_file_cache.dat2")
    }

    pub fn master_index_path(&self) -> PathBuf {
        self.dir.path().join("main_file_cache.idx255")
    }

    /// Overwrite one byte of the data file in place
    pub fn poke(&self, position: usize, value: u8) {
        self.overwrite(&self.data_path(), position, &[value]);
    }

    /// Overwrite `bytes` of `path` starting at `position`
    pub fn overwrite(&self, path: &Path, position: usize, bytes: &[u8]) {
        let mut contents = fs::read(path).unwrap();
        contents[position..position + bytes.len()].copy_from_slice(bytes);
        fs::write(path, contents).unwrap();
    }
}

/// Builds a cache through the encode paths
pub struct FixtureBuilder {
    archives: BTreeMap<u8, Vec<StoredGroup>>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            archives: BTreeMap::new(),
        }
    }

    pub fn group(mut self, archive: u8, group: StoredGroup) -> Self {
        self.archives.entry(archive).or_default().push(group);
        self
    }

    pub fn build(self) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut data = Cursor::new(Vec::new());
        let mut next_block = 1u32;
        let mut directories = BTreeMap::new();
        let mut pointers = BTreeMap::new();
        let mut master_index = Vec::new();

        for (&archive, groups) in &self.archives {
            let mut index = Vec::new();
            let mut entries = BTreeMap::new();
            let wide = groups.iter().any(|g| g.id > 0xFFFF);

            for stored_group in groups {
                let stored =
                    Envelope::new(stored_group.compression, group_payload(&stored_group.files))
                        .with_version(1)
                        .encode(&stored_group.key)
                        .unwrap();
                let extended = BlockHeader::needs_extended(stored_group.id);
                let pointer = encode_payload(
                    &mut data,
                    archive,
                    stored_group.id,
                    extended,
                    next_block,
                    BLOCK_LEN,
                    &stored,
                )
                .unwrap();
                next_block += blocks_needed(stored.len(), extended, BLOCK_LEN) as u32;
                put_record(&mut index, stored_group.id as usize, pointer);
                pointers.insert((archive, stored_group.id), pointer);

                entries.insert(
                    stored_group.id,
                    Group {
                        id: stored_group.id,
                        // Checksum covers the envelope without its version trailer
                        crc: crc32fast::hash(&stored[..stored.len() - 2]),
                        version: 1,
                        files: stored_group
                            .files
                            .iter()
                            .map(|(id, _)| GroupFile::new(*id))
                            .collect(),
                        name_hash: None,
                    },
                );
            }

            let mut directory = Directory {
                crc: 0,
                format: if wide {
                    FormatType::Smart
                } else {
                    FormatType::Versioned
                },
                format_word: 3,
                flags: 0,
                groups: entries,
            };
            let stored = Envelope::new(Compression::Gzip, directory.to_bytes().unwrap())
                .encode(&XteaKey::ZERO)
                .unwrap();
            directory.crc = crc32fast::hash(&stored);

            let pointer = encode_payload(
                &mut data,
                DEFAULT_MASTER_INDEX_ID,
                u32::from(archive),
                false,
                next_block,
                BLOCK_LEN,
                &stored,
            )
            .unwrap();
            next_block += blocks_needed(stored.len(), false, BLOCK_LEN) as u32;
            put_record(&mut master_index, archive as usize, pointer);

            fs::write(dir.path().join(format!("main_file_cache.idx{archive}")), index).unwrap();
            directories.insert(archive, directory);
        }

        fs::write(dir.path().join("main_file_cache.dat2"), data.into_inner()).unwrap();
        fs::write(dir.path().join("main_file_cache.idx255"), master_index).unwrap();

        Fixture {
            dir,
            directories,
            pointers,
        }
    }
}

/// Pack files into a group payload, splitting each file across two chunks
fn group_payload(files: &[(u32, Vec<u8>)]) -> Vec<u8> {
    if files.len() == 1 {
        return files[0].1.clone();
    }
    let (first, second): (Vec<_>, Vec<_>) = files
        .iter()
        .map(|(_, bytes)| {
            let (a, b) = bytes.split_at(bytes.len() / 2);
            (a.to_vec(), b.to_vec())
        })
        .unzip();
    encode_group_files(&[first, second]).unwrap()
}

fn put_record(index: &mut Vec<u8>, id: usize, pointer: BlockPointer) {
    let at = id * 6;
    if index.len() < at + 6 {
        index.resize(at + 6, 0);
    }
    index[at..at + 6].copy_from_slice(&pointer.to_bytes().unwrap());
}

/// Deterministic test bytes
pub fn bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_mul(31).wrapping_add((i % 253) as u8))
        .collect()
}
