//! Locating a group's payload through its archive index

use crate::block::{BlockHeader, BlockPointer, RawPayload, decode_payload, read_record};
use crate::config::CacheConfig;
use crate::Result;
use runecache_formats::ByteCursor;
use std::io::{Read, Seek};

/// Reassemble the stored bytes of `group` in `archive`.
///
/// Reads the group's record from the archive index file, then walks the
/// chain in the data file. Group ids above `0xFFFF` use extended headers.
pub fn locate_group<D, I>(
    data: &mut D,
    index: &mut I,
    archive: u8,
    group: u32,
    config: &CacheConfig,
    record: &mut Vec<u8>,
    scratch: &mut Vec<u8>,
) -> Result<RawPayload>
where
    D: Read + Seek,
    I: Read + Seek,
{
    record.resize(config.index_block_length, 0);
    read_record(
        index,
        u64::from(group) * config.index_block_length as u64,
        record,
    )?;
    let pointer = BlockPointer::decode(&mut ByteCursor::new(record))?;

    decode_payload(
        data,
        archive,
        group,
        BlockHeader::needs_extended(group),
        pointer,
        config.data_block_length,
        scratch,
    )
}
