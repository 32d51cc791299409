//! Archive directory codec
//!
//! A directory lists every group of one archive together with its CRC,
//! version, file ids and optional name hashes. The layout is column
//! oriented: each field is written for all groups before the next field
//! begins.
//!
//! ```text
//! format (1) [format word (4)] flags (1) group count
//! group id deltas            x groups
//! [group name hashes (4)]    x groups
//! group crcs (4)             x groups
//! group versions (4)         x groups
//! file counts                x groups
//! file id deltas             x files, group by group
//! [file name hashes (4)]     x files, group by group
//! ```
//!
//! Counts, ids and deltas use the integer width selected by [`FormatType`].

pub mod error;

pub use error::{DirectoryError, DirectoryResult};

use crate::cursor::{ByteCursor, ByteWriter, SMART_MAX, smart_len};
use std::collections::BTreeMap;

/// Flag bit marking that groups and files carry 4-byte name hashes
pub const HASHED_NAMES: u8 = 0x01;

/// Directory format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormatType {
    /// No format word, 2-byte integers
    Original = 5,
    /// 4-byte format word, 2-byte integers
    Versioned = 6,
    /// 4-byte format word, smart integers
    Smart = 7,
}

impl FormatType {
    /// Parse a format selector byte
    pub fn from_opcode(opcode: u8) -> DirectoryResult<Self> {
        match opcode {
            5 => Ok(Self::Original),
            6 => Ok(Self::Versioned),
            7 => Ok(Self::Smart),
            other => Err(DirectoryError::IllegalFormatType(other)),
        }
    }

    /// Wire opcode
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Whether a 4-byte format word follows the selector
    pub const fn has_format_word(self) -> bool {
        !matches!(self, Self::Original)
    }

    /// Largest count or id delta this format can encode
    pub const fn max_value(self) -> u32 {
        match self {
            Self::Smart => SMART_MAX,
            Self::Original | Self::Versioned => u16::MAX as u32,
        }
    }

    fn read_int(self, cursor: &mut ByteCursor<'_>) -> DirectoryResult<u32> {
        Ok(match self {
            Self::Smart => cursor.read_smart()?,
            Self::Original | Self::Versioned => cursor.read_u16()?.into(),
        })
    }

    fn write_int(self, writer: &mut ByteWriter<'_>, value: u32) -> DirectoryResult<()> {
        if value > self.max_value() {
            return Err(DirectoryError::ValueOutOfRange {
                value,
                max: self.max_value(),
            });
        }
        match self {
            Self::Smart => writer.write_smart(value)?,
            Self::Original | Self::Versioned => writer.write_u16(value as u16)?,
        }
        Ok(())
    }

    const fn int_len(self, value: u32) -> usize {
        match self {
            Self::Smart => smart_len(value),
            Self::Original | Self::Versioned => 2,
        }
    }
}

impl TryFrom<u8> for FormatType {
    type Error = DirectoryError;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        Self::from_opcode(opcode)
    }
}

/// One file entry within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupFile {
    /// File id
    pub id: u32,
    /// Name hash, present when the directory uses hashed names
    pub name_hash: Option<u32>,
}

impl GroupFile {
    /// Create an unnamed file entry
    pub const fn new(id: u32) -> Self {
        Self { id, name_hash: None }
    }

    /// Create a named file entry
    pub const fn named(id: u32, name_hash: u32) -> Self {
        Self {
            id,
            name_hash: Some(name_hash),
        }
    }
}

/// One group entry within a directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    /// Group id
    pub id: u32,
    /// CRC32 of the stored group envelope
    pub crc: u32,
    /// Group version
    pub version: u32,
    /// Files in on-disk order
    pub files: Vec<GroupFile>,
    /// Name hash, present when the directory uses hashed names
    pub name_hash: Option<u32>,
}

impl Group {
    /// Number of files in the group
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Position of `file_id` within the group
    pub fn file_index(&self, file_id: u32) -> Option<usize> {
        self.files.iter().position(|file| file.id == file_id)
    }
}

/// One archive's table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    /// CRC32 of the stored directory envelope
    pub crc: u32,
    /// Integer format
    pub format: FormatType,
    /// Format word (0 for [`FormatType::Original`])
    pub format_word: u32,
    /// Raw flags byte
    pub flags: u8,
    /// Groups keyed by id
    pub groups: BTreeMap<u32, Group>,
}

impl Directory {
    /// Whether groups and files carry name hashes
    pub const fn has_hashed_names(&self) -> bool {
        self.flags & HASHED_NAMES != 0
    }

    /// Look up a group
    pub fn group(&self, id: u32) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the directory has no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Decode a directory. `crc` is the checksum of the envelope it came from.
    pub fn decode(cursor: &mut ByteCursor<'_>, crc: u32) -> DirectoryResult<Self> {
        let format = FormatType::from_opcode(cursor.read_u8()?)?;
        let format_word = if format.has_format_word() {
            cursor.read_u32()?
        } else {
            0
        };
        let flags = cursor.read_u8()?;
        let hashed = flags & HASHED_NAMES != 0;

        let group_count = format.read_int(cursor)? as usize;

        let mut ids = Vec::with_capacity(group_count.min(cursor.remaining()));
        let mut id = 0u32;
        for _ in 0..group_count {
            id = id.wrapping_add(format.read_int(cursor)?);
            ids.push(id);
        }

        let names = if hashed {
            read_u32_column(cursor, group_count)?
        } else {
            Vec::new()
        };
        let crcs = read_u32_column(cursor, group_count)?;
        let versions = read_u32_column(cursor, group_count)?;

        let mut file_counts = Vec::with_capacity(ids.len());
        for _ in 0..group_count {
            file_counts.push(format.read_int(cursor)? as usize);
        }

        let mut file_ids = Vec::with_capacity(ids.len());
        for &count in &file_counts {
            let mut ids = Vec::with_capacity(count.min(cursor.remaining()));
            let mut id = 0u32;
            for _ in 0..count {
                id = id.wrapping_add(format.read_int(cursor)?);
                ids.push(id);
            }
            file_ids.push(ids);
        }

        let mut file_names = Vec::with_capacity(if hashed { group_count } else { 0 });
        if hashed {
            for &count in &file_counts {
                file_names.push(read_u32_column(cursor, count)?);
            }
        }

        let mut groups = BTreeMap::new();
        for (i, ids_in_group) in file_ids.into_iter().enumerate() {
            let files = ids_in_group
                .into_iter()
                .enumerate()
                .map(|(j, id)| GroupFile {
                    id,
                    name_hash: file_names.get(i).map(|names| names[j]),
                })
                .collect();

            let group = Group {
                id: ids[i],
                crc: crcs[i],
                version: versions[i],
                files,
                name_hash: names.get(i).copied(),
            };
            if groups.insert(group.id, group).is_some() {
                return Err(DirectoryError::DuplicateGroupId(ids[i]));
            }
        }

        Ok(Self {
            crc,
            format,
            format_word,
            flags,
            groups,
        })
    }

    /// Encode the directory. Ids are written as the absolute difference from
    /// the previous id, so they must be ascending to decode back unchanged.
    pub fn encode(&self, writer: &mut ByteWriter<'_>) -> DirectoryResult<()> {
        let format = self.format;
        let hashed = self.has_hashed_names();
        self.check_name_hashes(hashed)?;

        writer.write_u8(format.opcode())?;
        if format.has_format_word() {
            writer.write_u32(self.format_word)?;
        }
        writer.write_u8(self.flags)?;
        format.write_int(writer, count_u32(self.groups.len()))?;

        let mut previous = 0u32;
        for &id in self.groups.keys() {
            format.write_int(writer, previous.abs_diff(id))?;
            previous = id;
        }

        if hashed {
            for group in self.groups.values() {
                if let Some(hash) = group.name_hash {
                    writer.write_u32(hash)?;
                }
            }
        }
        for group in self.groups.values() {
            writer.write_u32(group.crc)?;
        }
        for group in self.groups.values() {
            writer.write_u32(group.version)?;
        }
        for group in self.groups.values() {
            format.write_int(writer, count_u32(group.files.len()))?;
        }
        for group in self.groups.values() {
            let mut previous = 0u32;
            for file in &group.files {
                format.write_int(writer, previous.abs_diff(file.id))?;
                previous = file.id;
            }
        }
        if hashed {
            for group in self.groups.values() {
                for file in &group.files {
                    if let Some(hash) = file.name_hash {
                        writer.write_u32(hash)?;
                    }
                }
            }
        }
        Ok(())
    }

    // Every group and file carries a name hash exactly when the flags say so
    fn check_name_hashes(&self, hashed: bool) -> DirectoryResult<()> {
        for group in self.groups.values() {
            if group.name_hash.is_some() != hashed {
                return Err(DirectoryError::InconsistentNameHash {
                    group: group.id,
                    file: None,
                });
            }
            if let Some(file) = group.files.iter().find(|f| f.name_hash.is_some() != hashed) {
                return Err(DirectoryError::InconsistentNameHash {
                    group: group.id,
                    file: Some(file.id),
                });
            }
        }
        Ok(())
    }

    /// Exact size of the encoded directory
    pub fn encoded_len(&self) -> usize {
        let format = self.format;
        let hash_len = if self.has_hashed_names() { 4 } else { 0 };

        let mut len = 1 + if format.has_format_word() { 4 } else { 0 } + 1;
        len += format.int_len(count_u32(self.groups.len()));

        let mut previous = 0u32;
        for group in self.groups.values() {
            len += format.int_len(previous.abs_diff(group.id));
            previous = group.id;

            len += hash_len + 4 + 4;
            len += format.int_len(count_u32(group.files.len()));

            let mut previous_file = 0u32;
            for file in &group.files {
                len += format.int_len(previous_file.abs_diff(file.id)) + hash_len;
                previous_file = file.id;
            }
        }
        len
    }

    /// Encode into a freshly allocated buffer
    pub fn to_bytes(&self) -> DirectoryResult<Vec<u8>> {
        let mut buf = vec![0u8; self.encoded_len()];
        let mut writer = ByteWriter::new(&mut buf);
        self.encode(&mut writer)?;
        Ok(buf)
    }
}

fn read_u32_column(cursor: &mut ByteCursor<'_>, count: usize) -> DirectoryResult<Vec<u32>> {
    let mut column = Vec::with_capacity(count.min(cursor.remaining() / 4));
    for _ in 0..count {
        column.push(cursor.read_u32()?);
    }
    Ok(column)
}

// Lengths above u32::MAX are clamped so write_int rejects them as out of range
fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
