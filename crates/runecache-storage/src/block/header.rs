//! Data block headers

use crate::{Result, StorageError};
use binrw::{BinRead, BinResult, BinWrite, Endian};
use runecache_formats::cursor::U24_MAX;
use runecache_formats::{ByteCursor, ByteWriter, CursorError};
use std::io::{Cursor, Read, Seek, Write};

/// Header size with a 2-byte group id
pub const HEADER_LEN: usize = 8;

/// Header size with a 4-byte group id
pub const EXTENDED_HEADER_LEN: usize = 10;

/// Header at the start of every data block.
///
/// On disk: group id (2 bytes, or 4 when extended), block index (2),
/// next block (3), archive id (1). The layout is selected with the
/// `extended` import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(big)]
#[br(import(extended: bool))]
#[bw(import(extended: bool))]
pub struct BlockHeader {
    /// Group the block belongs to
    #[br(parse_with = read_group_id, args(extended))]
    #[bw(write_with = write_group_id, args(extended))]
    pub group: u32,
    /// Position of the block within its chain
    pub index: u16,
    /// Block holding the continuation
    #[br(map = |x: [u8; 3]| u32::from_be_bytes([0, x[0], x[1], x[2]]))]
    #[bw(write_with = super::write_u24)]
    pub next: u32,
    /// Archive the block belongs to
    pub archive: u8,
}

fn read_group_id<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    (extended,): (bool,),
) -> BinResult<u32> {
    if extended {
        u32::read_options(reader, endian, ())
    } else {
        u16::read_options(reader, endian, ()).map(u32::from)
    }
}

fn write_group_id<W: Write + Seek>(
    group: &u32,
    writer: &mut W,
    endian: Endian,
    (extended,): (bool,),
) -> BinResult<()> {
    if extended {
        return group.write_options(writer, endian, ());
    }
    let narrow = u16::try_from(*group).map_err(|_| binrw::Error::AssertFail {
        pos: 0,
        message: format!("group {group} needs an extended header"),
    })?;
    narrow.write_options(writer, endian, ())
}

impl BlockHeader {
    /// Header size for the given layout
    pub const fn size(extended: bool) -> usize {
        if extended {
            EXTENDED_HEADER_LEN
        } else {
            HEADER_LEN
        }
    }

    /// Whether `group` needs the extended layout
    pub const fn needs_extended(group: u32) -> bool {
        group > 0xFFFF
    }

    /// Decode a header. A short buffer leaves the cursor untouched.
    pub fn decode(cursor: &mut ByteCursor<'_>, extended: bool) -> Result<Self> {
        let raw = cursor.read_bytes(Self::size(extended))?;
        Ok(Self::read_args(&mut Cursor::new(raw), (extended,))?)
    }

    /// Encode a header
    pub fn encode(&self, writer: &mut ByteWriter<'_>, extended: bool) -> Result<()> {
        if !extended && Self::needs_extended(self.group) {
            return Err(StorageError::GroupIdTooWide(self.group));
        }
        if self.next > U24_MAX {
            return Err(StorageError::InvalidPointerOffset);
        }
        let size = Self::size(extended);
        if writer.remaining() < size {
            return Err(CursorError::Overflow {
                position: writer.position(),
                requested: size,
                capacity: writer.capacity(),
            }
            .into());
        }

        let mut buf = [0u8; EXTENDED_HEADER_LEN];
        self.write_args(&mut Cursor::new(&mut buf[..]), (extended,))?;
        writer.write_bytes(&buf[..size])?;
        Ok(())
    }
}
