//! Binary codecs for the runecache block-chained cache format
//!
//! This crate provides symmetric (decode and encode) implementations of the
//! formats that sit on top of the raw block store:
//!
//! - **Cursor**: bounds-checked big-endian reader and writer, including the
//!   self-describing "smart" 2-or-4 byte integer
//! - **Envelope**: compression tag, length, optional XTEA cipher, CRC32 and
//!   optional version trailer wrapped around every group
//! - **Directory**: one archive's column-oriented table of groups and files
//! - **Group files**: splitting a multi-file group payload into its files
//!
//! # Round-trip guarantee
//!
//! For every well-formed value, `decode(encode(x)) == x`.

#![warn(missing_docs)]
#![allow(clippy::cast_lossless)] // Sometimes clearer than From

pub mod cursor;
pub mod directory;
pub mod envelope;
pub mod group_files;

pub use cursor::{ByteCursor, ByteWriter, CursorError};
pub use directory::{Directory, DirectoryError, FormatType, Group, GroupFile};
pub use envelope::{Compression, Envelope, EnvelopeError};
pub use group_files::{GroupFileError, encode_group_files, split_group_files};
