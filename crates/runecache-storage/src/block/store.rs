//! Reassembling and writing block chains

use super::header::BlockHeader;
use super::pointer::BlockPointer;
use crate::{Result, StorageError};
use runecache_formats::cursor::U24_MAX;
use runecache_formats::{ByteCursor, ByteWriter};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use tracing::trace;

/// A reassembled payload, still enciphered and compressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    /// Archive the payload was read for
    pub archive: u8,
    /// Group the payload was read for
    pub group: u32,
    /// Payload bytes
    pub data: Vec<u8>,
}

/// Walk the chain described by `pointer` and collect its payload.
///
/// Every block header must name `archive` and `group` and carry the
/// block's position in the chain; the first mismatch aborts the walk.
/// `scratch` is reused between calls to hold one block.
pub fn decode_payload<R: Read + Seek>(
    reader: &mut R,
    archive: u8,
    group: u32,
    extended: bool,
    pointer: BlockPointer,
    block_len: usize,
    scratch: &mut Vec<u8>,
) -> Result<RawPayload> {
    let header_len = BlockHeader::size(extended);
    let chunk_capacity = chunk_capacity(header_len, block_len)?;

    let total = pointer.length as usize;
    let mut data = vec![0u8; total];
    scratch.resize(block_len, 0);

    let mut read = 0usize;
    let mut expected_index = 0u16;
    let mut block = pointer.offset;

    while read < total {
        let chunk = chunk_capacity.min(total - read);
        let wanted = header_len + chunk;

        reader.seek(SeekFrom::Start(u64::from(block) * block_len as u64))?;
        let got = read_full(reader, &mut scratch[..wanted])?;
        if got != wanted {
            return Err(StorageError::BlockReadMalformed {
                expected: wanted,
                actual: got,
            });
        }

        let header = BlockHeader::decode(&mut ByteCursor::new(&scratch[..header_len]), extended)?;
        trace!(
            archive,
            group,
            block,
            index = header.index,
            next = header.next,
            "read block"
        );

        if header.archive != archive {
            return Err(StorageError::ArchiveMismatch {
                expected: archive,
                actual: header.archive,
            });
        }
        if header.group != group {
            return Err(StorageError::GroupMismatch {
                expected: group,
                actual: header.group,
            });
        }
        if header.index != expected_index {
            return Err(StorageError::BlockMismatch {
                expected: expected_index,
                actual: header.index,
            });
        }

        data[read..read + chunk].copy_from_slice(&scratch[header_len..wanted]);
        read += chunk;
        block = header.next;
        expected_index = expected_index.wrapping_add(1);
    }

    Ok(RawPayload {
        archive,
        group,
        data,
    })
}

/// Write `data` as a chain of consecutive blocks starting at `first_block`.
///
/// Each block points at the one after it and the last block's next pointer
/// is 0. The final block is written without padding. Returns the pointer
/// record describing the chain.
pub fn encode_payload<W: Write + Seek>(
    writer: &mut W,
    archive: u8,
    group: u32,
    extended: bool,
    first_block: u32,
    block_len: usize,
    data: &[u8],
) -> Result<BlockPointer> {
    let header_len = BlockHeader::size(extended);
    let chunk_capacity = chunk_capacity(header_len, block_len)?;

    let length = u32::try_from(data.len())
        .ok()
        .filter(|&len| len > 0 && len <= U24_MAX)
        .ok_or(StorageError::InvalidPointerLength)?;

    let block_count = data.len().div_ceil(chunk_capacity);
    let last_block = u64::from(first_block) + block_count as u64 - 1;
    if first_block == 0 || last_block > u64::from(U24_MAX) {
        return Err(StorageError::InvalidPointerOffset);
    }

    let mut buf = vec![0u8; block_len];
    for (i, chunk) in data.chunks(chunk_capacity).enumerate() {
        let block = first_block + i as u32;
        let next = if i + 1 == block_count { 0 } else { block + 1 };
        let header = BlockHeader {
            archive,
            group,
            index: i as u16,
            next,
        };

        let mut block_writer = ByteWriter::new(&mut buf);
        header.encode(&mut block_writer, extended)?;
        block_writer.write_bytes(chunk)?;
        let written = block_writer.position();

        writer.seek(SeekFrom::Start(u64::from(block) * block_len as u64))?;
        writer.write_all(&buf[..written])?;
        trace!(archive, group, block, next, "wrote block");
    }

    Ok(BlockPointer::new(first_block, length))
}

/// Number of blocks a payload of `len` bytes occupies
pub fn blocks_needed(len: usize, extended: bool, block_len: usize) -> usize {
    let header_len = BlockHeader::size(extended);
    len.div_ceil(block_len.saturating_sub(header_len).max(1))
}

fn chunk_capacity(header_len: usize, block_len: usize) -> Result<usize> {
    if block_len <= header_len {
        return Err(StorageError::InvalidConfig(format!(
            "block length {block_len} must exceed header length {header_len}"
        )));
    }
    Ok(block_len - header_len)
}

/// Read until `buf` is full or the reader is exhausted
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub(crate) fn read_record<R: Read + Seek>(
    reader: &mut R,
    position: u64,
    buf: &mut [u8],
) -> Result<()> {
    reader.seek(SeekFrom::Start(position))?;
    let got = read_full(reader, buf)?;
    if got != buf.len() {
        return Err(StorageError::MalformedIndexRead {
            expected: buf.len(),
            actual: got,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::block::{EXTENDED_HEADER_LEN, HEADER_LEN};
    use std::io::Cursor;

    const BLOCK_LEN: usize = 520;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_two_block_chain() {
        let data = sample(1000);
        let mut file = Cursor::new(Vec::new());
        let pointer = encode_payload(&mut file, 3, 17, false, 1, BLOCK_LEN, &data).unwrap();
        assert_eq!(pointer, BlockPointer::new(1, 1000));
        assert_eq!(blocks_needed(1000, false, BLOCK_LEN), 2);

        // Second block is unpadded: header plus the 488 remaining bytes
        assert_eq!(file.get_ref().len(), 2 * BLOCK_LEN + HEADER_LEN + 488);

        let mut scratch = Vec::new();
        let payload =
            decode_payload(&mut file, 3, 17, false, pointer, BLOCK_LEN, &mut scratch).unwrap();
        assert_eq!(payload.data, data);
        assert_eq!(payload.archive, 3);
        assert_eq!(payload.group, 17);
    }

    #[test]
    fn test_archive_mismatch_in_second_block() {
        let data = sample(1000);
        let mut file = Cursor::new(Vec::new());
        let pointer = encode_payload(&mut file, 3, 17, false, 1, BLOCK_LEN, &data).unwrap();

        // Archive id is the last header byte
        file.get_mut()[2 * BLOCK_LEN + HEADER_LEN - 1] = 4;

        let mut scratch = Vec::new();
        let err =
            decode_payload(&mut file, 3, 17, false, pointer, BLOCK_LEN, &mut scratch).unwrap_err();
        assert!(matches!(
            err,
            StorageError::ArchiveMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_group_and_index_mismatch() {
        let data = sample(1200);
        let mut file = Cursor::new(Vec::new());
        let pointer = encode_payload(&mut file, 0, 5, false, 1, BLOCK_LEN, &data).unwrap();

        let mut corrupted = file.clone();
        corrupted.get_mut()[BLOCK_LEN + 1] = 6;
        let err = decode_payload(&mut corrupted, 0, 5, false, pointer, BLOCK_LEN, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::GroupMismatch {
                expected: 5,
                actual: 6
            }
        ));

        let mut corrupted = file.clone();
        corrupted.get_mut()[2 * BLOCK_LEN + 3] = 9;
        let err = decode_payload(&mut corrupted, 0, 5, false, pointer, BLOCK_LEN, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::BlockMismatch {
                expected: 1,
                actual: 9
            }
        ));
    }

    #[test]
    fn test_truncated_file() {
        let data = sample(600);
        let mut file = Cursor::new(Vec::new());
        let pointer = encode_payload(&mut file, 1, 1, false, 1, BLOCK_LEN, &data).unwrap();
        file.get_mut().truncate(2 * BLOCK_LEN + 20);

        let err = decode_payload(&mut file, 1, 1, false, pointer, BLOCK_LEN, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::BlockReadMalformed {
                expected: 96,
                actual: 20
            }
        ));
    }

    #[test]
    fn test_extended_chain() {
        let data = sample(2000);
        let mut file = Cursor::new(Vec::new());
        let pointer =
            encode_payload(&mut file, 7, 0x0001_0001, true, 4, BLOCK_LEN, &data).unwrap();
        assert_eq!(blocks_needed(2000, true, BLOCK_LEN), 4);

        let payload = decode_payload(
            &mut file,
            7,
            0x0001_0001,
            true,
            pointer,
            BLOCK_LEN,
            &mut Vec::new(),
        )
        .unwrap();
        assert_eq!(payload.data, data);

        // Terminal block points nowhere
        let last = 7 * BLOCK_LEN;
        let header = BlockHeader::decode(
            &mut ByteCursor::new(&file.get_ref()[last..last + EXTENDED_HEADER_LEN]),
            true,
        )
        .unwrap();
        assert_eq!(header.index, 3);
        assert_eq!(header.next, 0);
    }

    #[test]
    fn test_encode_rejects_bad_pointers() {
        let mut file = Cursor::new(Vec::new());
        assert!(matches!(
            encode_payload(&mut file, 0, 0, false, 1, BLOCK_LEN, &[]),
            Err(StorageError::InvalidPointerLength)
        ));
        assert!(matches!(
            encode_payload(&mut file, 0, 0, false, 0, BLOCK_LEN, &[1]),
            Err(StorageError::InvalidPointerOffset)
        ));
        assert!(matches!(
            encode_payload(&mut file, 0, 0, false, 1, HEADER_LEN, &[1]),
            Err(StorageError::InvalidConfig(_))
        ));
    }
}
