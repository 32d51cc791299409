//! Bounds-checked big-endian cursors over byte buffers.
//!
//! [`ByteCursor`] reads from a shared slice and [`ByteWriter`] writes into a
//! mutable one. Every operation checks its bounds before touching the
//! position, so a failed read or write leaves the cursor where it was.

use thiserror::Error;

/// Largest value representable by the smart integer encoding
pub const SMART_MAX: u32 = 0x7FFF_FFFF;

/// Values below this are encoded as 2-byte smart integers
pub const SMART_SHORT_LIMIT: u32 = 0x8000;

/// Largest value representable in 3 bytes
pub const U24_MAX: u32 = 0x00FF_FFFF;

/// Cursor errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    /// A write would run past the end of the buffer
    #[error("buffer overflow: writing {requested} bytes at position {position} exceeds capacity {capacity}")]
    Overflow {
        /// Position at which the write was attempted
        position: usize,
        /// Number of bytes requested
        requested: usize,
        /// Total buffer capacity
        capacity: usize,
    },

    /// A read would run past the end of the buffer
    #[error("buffer underflow: reading {requested} bytes at position {position} exceeds capacity {capacity}")]
    Underflow {
        /// Position at which the read was attempted
        position: usize,
        /// Number of bytes requested
        requested: usize,
        /// Total buffer capacity
        capacity: usize,
    },

    /// Value does not fit the smart integer encoding
    #[error("value {0} exceeds the smart integer range")]
    SmartOutOfRange(u32),
}

/// Sequential big-endian reader over a byte slice
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current position
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Total length of the underlying buffer
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// The underlying buffer
    pub const fn get_ref(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute position (may equal the buffer length).
    pub fn set_position(&mut self, position: usize) -> Result<(), CursorError> {
        if position > self.data.len() {
            return Err(CursorError::Underflow {
                position,
                requested: 0,
                capacity: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    fn check(&self, requested: usize) -> Result<(), CursorError> {
        if requested > self.remaining() {
            return Err(CursorError::Underflow {
                position: self.position,
                requested,
                capacity: self.data.len(),
            });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    /// Skip `count` bytes
    pub fn skip(&mut self, count: usize) -> Result<(), CursorError> {
        self.check(count)?;
        self.position += count;
        Ok(())
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        self.check(count)?;
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Fill `dst` from the cursor
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<(), CursorError> {
        let src = self.read_bytes(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Look at the next byte without advancing
    pub fn peek_u8(&self) -> Result<u8, CursorError> {
        self.check(1)?;
        Ok(self.data[self.position])
    }

    /// Read one unsigned byte
    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take::<1>()?[0])
    }

    /// Read a big-endian `u16`
    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        self.take().map(u16::from_be_bytes)
    }

    /// Read a big-endian `i16`
    pub fn read_i16(&mut self) -> Result<i16, CursorError> {
        self.take().map(i16::from_be_bytes)
    }

    /// Read a big-endian 3-byte unsigned integer
    pub fn read_u24(&mut self) -> Result<u32, CursorError> {
        let [a, b, c] = self.take()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Read a big-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        self.take().map(u32::from_be_bytes)
    }

    /// Read a big-endian `i32`
    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        self.take().map(i32::from_be_bytes)
    }

    /// Read a big-endian `u64`
    pub fn read_u64(&mut self) -> Result<u64, CursorError> {
        self.take().map(u64::from_be_bytes)
    }

    /// Read a smart integer.
    ///
    /// If the high bit of the next byte is clear the value occupies 2 bytes,
    /// otherwise 4 bytes with the high bit masked off.
    pub fn read_smart(&mut self) -> Result<u32, CursorError> {
        if self.peek_u8()? & 0x80 == 0 {
            self.read_u16().map(u32::from)
        } else {
            Ok(self.read_u32()? & SMART_MAX)
        }
    }
}

/// Sequential big-endian writer into a fixed-capacity buffer
#[derive(Debug)]
pub struct ByteWriter<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> ByteWriter<'a> {
    /// Create a writer positioned at the start of `data`
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current position
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Total capacity of the underlying buffer
    pub const fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes left before the buffer is full
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// The bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.data[..self.position]
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        if bytes.len() > self.remaining() {
            return Err(CursorError::Overflow {
                position: self.position,
                requested: bytes.len(),
                capacity: self.data.len(),
            });
        }
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        self.put(bytes)
    }

    /// Write one byte
    pub fn write_u8(&mut self, value: u8) -> Result<(), CursorError> {
        self.put(&[value])
    }

    /// Write a big-endian `u16`
    pub fn write_u16(&mut self, value: u16) -> Result<(), CursorError> {
        self.put(&value.to_be_bytes())
    }

    /// Write a big-endian `i16`
    pub fn write_i16(&mut self, value: i16) -> Result<(), CursorError> {
        self.put(&value.to_be_bytes())
    }

    /// Write the low 3 bytes of `value`, big-endian
    pub fn write_u24(&mut self, value: u32) -> Result<(), CursorError> {
        self.put(&value.to_be_bytes()[1..])
    }

    /// Write a big-endian `u32`
    pub fn write_u32(&mut self, value: u32) -> Result<(), CursorError> {
        self.put(&value.to_be_bytes())
    }

    /// Write a big-endian `i32`
    pub fn write_i32(&mut self, value: i32) -> Result<(), CursorError> {
        self.put(&value.to_be_bytes())
    }

    /// Write a big-endian `u64`
    pub fn write_u64(&mut self, value: u64) -> Result<(), CursorError> {
        self.put(&value.to_be_bytes())
    }

    /// Write a smart integer (2 bytes below `0x8000`, else 4 bytes)
    pub fn write_smart(&mut self, value: u32) -> Result<(), CursorError> {
        if value > SMART_MAX {
            return Err(CursorError::SmartOutOfRange(value));
        }
        if value < SMART_SHORT_LIMIT {
            self.write_u16(value as u16)
        } else {
            self.write_u32(value | 0x8000_0000)
        }
    }
}

/// Encoded size of a smart integer
pub const fn smart_len(value: u32) -> usize {
    if value < SMART_SHORT_LIMIT { 2 } else { 4 }
}
