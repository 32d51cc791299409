//! Index file pointer records

use crate::{Result, StorageError};
use binrw::{BinRead, BinWrite};
use runecache_formats::cursor::U24_MAX;
use runecache_formats::{ByteCursor, ByteWriter, CursorError};
use std::io::Cursor;

/// Size of one pointer record
pub const POINTER_LEN: usize = 6;

/// Locates a payload in the data file.
///
/// On disk: 3-byte length, then 3-byte first block, both big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(big)]
pub struct BlockPointer {
    /// Payload length in bytes
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    #[bw(write_with = super::write_u24)]
    pub length: u32,
    /// First block of the chain
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    #[bw(write_with = super::write_u24)]
    pub offset: u32,
}

impl BlockPointer {
    /// Create a pointer
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { length, offset }
    }

    /// Decode a pointer record. A short buffer leaves the cursor untouched.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let record = cursor.read_bytes(POINTER_LEN)?;
        let pointer = Self::read(&mut Cursor::new(record))?;

        if pointer.length == 0 {
            return Err(StorageError::InvalidPointerLength);
        }
        if pointer.offset == 0 {
            return Err(StorageError::InvalidPointerOffset);
        }
        Ok(pointer)
    }

    /// Encode a pointer record
    pub fn encode(&self, writer: &mut ByteWriter<'_>) -> Result<()> {
        if writer.remaining() < POINTER_LEN {
            return Err(CursorError::Overflow {
                position: writer.position(),
                requested: POINTER_LEN,
                capacity: writer.capacity(),
            }
            .into());
        }
        writer.write_bytes(&self.to_bytes()?)?;
        Ok(())
    }

    /// Encode into a standalone record
    pub fn to_bytes(&self) -> Result<[u8; POINTER_LEN]> {
        if self.length == 0 || self.length > U24_MAX {
            return Err(StorageError::InvalidPointerLength);
        }
        if self.offset == 0 || self.offset > U24_MAX {
            return Err(StorageError::InvalidPointerOffset);
        }
        let mut buf = [0u8; POINTER_LEN];
        self.write(&mut Cursor::new(&mut buf[..]))?;
        Ok(buf)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn pointer_round_trip(offset in 1u32..=U24_MAX, length in 1u32..=U24_MAX) {
            let pointer = BlockPointer::new(offset, length);
            let bytes = pointer.to_bytes().unwrap();
            let decoded = BlockPointer::decode(&mut ByteCursor::new(&bytes)).unwrap();
            prop_assert_eq!(decoded, pointer);
        }
    }
}
