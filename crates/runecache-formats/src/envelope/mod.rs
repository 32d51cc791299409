//! Compression and cipher envelope wrapped around every stored group
//!
//! # Wire layout
//!
//! ```text
//! [1B compression tag][4B compressed length]
//! [4B decompressed length, compressed envelopes only][compressed length bytes]
//! [optional 2B version]
//! ```
//!
//! Everything after the 5-byte header up to the end of the payload may be
//! XTEA enciphered. The CRC32 recorded in an archive directory covers the
//! header and payload exactly as stored, before deciphering.

pub mod compression;
pub mod error;

pub use compression::Compression;
pub use error::{EnvelopeError, EnvelopeResult};

use crate::cursor::ByteCursor;
use runecache_crypto::XteaKey;
use tracing::trace;

/// Default upper bound for the compressed length field
pub const DEFAULT_MAX_COMPRESSED_LENGTH: u32 = 1_000_000;

/// Size of the tag plus compressed length header
pub const HEADER_LEN: usize = 5;

/// Version value reserved as a tombstone
pub const TOMBSTONE_VERSION: i16 = -1;

/// A decoded envelope: the plain payload plus how it was stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Compression applied on disk
    pub compression: Compression,
    /// Trailing version, if present
    pub version: Option<i16>,
    /// Decompressed, deciphered payload
    pub data: Vec<u8>,
}

impl Envelope {
    /// Create an envelope without a version trailer
    pub fn new(compression: Compression, data: Vec<u8>) -> Self {
        Self {
            compression,
            version: None,
            data,
        }
    }

    /// Attach a version trailer
    #[must_use]
    pub fn with_version(mut self, version: i16) -> Self {
        self.version = Some(version);
        self
    }

    /// Decode an envelope from `cursor`.
    ///
    /// `crc` is fed the 5 header bytes and the stored payload before it is
    /// deciphered, so callers can accumulate a checksum across several
    /// envelopes. A zero `key` leaves the payload as stored.
    pub fn decode(
        cursor: &mut ByteCursor<'_>,
        key: &XteaKey,
        max_compressed_length: u32,
        crc: &mut crc32fast::Hasher,
    ) -> EnvelopeResult<Self> {
        let header = cursor.read_bytes(HEADER_LEN)?;
        let tag = header[0];
        let compressed_length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);

        if compressed_length > max_compressed_length {
            return Err(EnvelopeError::CompressedLengthOutOfBounds {
                length: compressed_length,
                max: max_compressed_length,
            });
        }
        crc.update(header);

        // The prefix width depends on the tag even before it is validated
        let prefix_len = if tag == Compression::None.tag() { 0 } else { 4 };
        let stored = cursor.read_bytes(compressed_length as usize + prefix_len)?;
        crc.update(stored);

        let mut payload = stored.to_vec();
        if !key.is_zero() {
            key.decipher(&mut payload);
        }

        let version = if cursor.remaining() >= 2 {
            let version = cursor.read_i16()?;
            if version == TOMBSTONE_VERSION {
                return Err(EnvelopeError::IllegalVersion(version));
            }
            Some(version)
        } else {
            None
        };

        let compression = Compression::from_tag(tag)?;
        trace!(
            ?compression,
            compressed_length,
            ciphered = !key.is_zero(),
            "decoding envelope"
        );

        let data = match compression {
            Compression::None => payload,
            Compression::Bzip2 | Compression::Gzip => {
                let expected =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
                let data = compression::decompress(&payload[4..], compression, expected)?;
                if data.len() != expected {
                    return Err(EnvelopeError::CompressionLengthMismatch {
                        expected,
                        actual: data.len(),
                    });
                }
                data
            }
        };

        Ok(Self {
            compression,
            version,
            data,
        })
    }

    /// Decode a standalone envelope with the default length bound,
    /// returning it with the CRC32 of its stored bytes.
    pub fn from_bytes(data: &[u8], key: &XteaKey) -> EnvelopeResult<(Self, u32)> {
        let mut crc = crc32fast::Hasher::new();
        let envelope = Self::decode(
            &mut ByteCursor::new(data),
            key,
            DEFAULT_MAX_COMPRESSED_LENGTH,
            &mut crc,
        )?;
        Ok((envelope, crc.finalize()))
    }

    /// Encode the envelope, enciphering the region after the header when
    /// `key` is non-zero.
    pub fn encode(&self, key: &XteaKey) -> EnvelopeResult<Vec<u8>> {
        if self.version == Some(TOMBSTONE_VERSION) {
            return Err(EnvelopeError::IllegalVersion(TOMBSTONE_VERSION));
        }

        let compressed = compression::compress(&self.data, self.compression)?;
        let compressed_length = u32::try_from(compressed.len())
            .map_err(|_| EnvelopeError::PayloadTooLarge(compressed.len()))?;

        let prefix_len = self.compression.prefix_len();
        let mut out = Vec::with_capacity(HEADER_LEN + prefix_len + compressed.len() + 2);
        out.push(self.compression.tag());
        out.extend_from_slice(&compressed_length.to_be_bytes());
        if prefix_len > 0 {
            let decompressed_length = u32::try_from(self.data.len())
                .map_err(|_| EnvelopeError::PayloadTooLarge(self.data.len()))?;
            out.extend_from_slice(&decompressed_length.to_be_bytes());
        }
        out.extend_from_slice(&compressed);

        if !key.is_zero() {
            key.encipher(&mut out[HEADER_LEN..]);
        }

        if let Some(version) = self.version {
            out.extend_from_slice(&version.to_be_bytes());
        }
        Ok(out)
    }
}
