//! Master directory bootstrap
//!
//! The master index holds one pointer record per archive. Each points at a
//! chain stored under the master archive id whose payload is the archive's
//! enveloped directory.

use crate::block::{BlockPointer, decode_payload, read_record};
use crate::config::CacheConfig;
use crate::Result;
use runecache_crypto::XteaKey;
use runecache_formats::{ByteCursor, Directory, Envelope};
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use tracing::{debug, info};

/// Read the directory of every archive in `archive_ids`.
///
/// Archives are visited in ascending order and the first failure aborts
/// the whole bootstrap.
pub fn read_directories<D, M>(
    data: &mut D,
    master_index: &mut M,
    archive_ids: &[u8],
    config: &CacheConfig,
    scratch: &mut Vec<u8>,
) -> Result<BTreeMap<u8, Directory>>
where
    D: Read + Seek,
    M: Read + Seek,
{
    let mut ids = archive_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut record = vec![0u8; config.index_block_length];
    let mut directories = BTreeMap::new();

    for id in ids {
        let directory = read_directory(data, master_index, id, config, &mut record, scratch)?;
        debug!(
            "Decoded directory for archive {}: {} groups, crc={:08x}",
            id,
            directory.len(),
            directory.crc
        );
        directories.insert(id, directory);
    }

    info!("Loaded {} archive directories", directories.len());
    Ok(directories)
}

/// Read and decode one archive's directory from the master index
pub fn read_directory<D, M>(
    data: &mut D,
    master_index: &mut M,
    archive: u8,
    config: &CacheConfig,
    record: &mut [u8],
    scratch: &mut Vec<u8>,
) -> Result<Directory>
where
    D: Read + Seek,
    M: Read + Seek,
{
    read_record(
        master_index,
        u64::from(archive) * record.len() as u64,
        record,
    )?;
    let pointer = BlockPointer::decode(&mut ByteCursor::new(record))?;

    let payload = decode_payload(
        data,
        config.master_index_id,
        u32::from(archive),
        false,
        pointer,
        config.data_block_length,
        scratch,
    )?;

    let mut crc = crc32fast::Hasher::new();
    let envelope = Envelope::decode(
        &mut ByteCursor::new(&payload.data),
        &XteaKey::ZERO,
        config.max_compressed_length,
        &mut crc,
    )?;

    let directory = Directory::decode(&mut ByteCursor::new(&envelope.data), crc.finalize())?;
    Ok(directory)
}
