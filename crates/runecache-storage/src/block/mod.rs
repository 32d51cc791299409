//! Fixed-size block chains in the data file
//!
//! A payload is stored as a chain of blocks. Every block starts with a
//! header naming its archive, group and position in the chain, and the
//! block to continue from. Pointer records in the index files give the
//! first block and the total payload length.

mod header;
mod pointer;
mod store;

use binrw::{BinResult, Endian};
use std::io::{Seek, Write};

pub use header::{BlockHeader, EXTENDED_HEADER_LEN, HEADER_LEN};
pub use pointer::{BlockPointer, POINTER_LEN};
pub use store::{RawPayload, blocks_needed, decode_payload, encode_payload};
pub(crate) use store::read_record;

/// binrw writer for the 3-byte big-endian fields of pointers and headers.
/// Values are range checked before encoding, so only the low 24 bits are kept.
fn write_u24<W: Write + Seek>(
    value: &u32,
    writer: &mut W,
    _endian: Endian,
    _args: (),
) -> BinResult<()> {
    let [_, high, mid, low] = value.to_be_bytes();
    writer.write_all(&[high, mid, low])?;
    Ok(())
}
