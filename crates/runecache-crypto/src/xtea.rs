//! XTEA block cipher used to protect individual archive groups.
//!
//! The cipher operates on 8-byte blocks interpreted as two big-endian
//! words. Input is processed in place; a trailing partial block (fewer than
//! 8 bytes) is left untouched, matching how the cache writer produced it.
//!
//! ## Usage
//!
//! ```rust
//! use runecache_crypto::XteaKey;
//!
//! let key = XteaKey::from_signed([-1, 0, 42, 7]);
//! let mut block = [0u8; 8];
//! key.encipher(&mut block);
//! key.decipher(&mut block);
//! assert_eq!(block, [0u8; 8]);
//! ```

use crate::error::CryptoError;

/// Key schedule constant (derived from the golden ratio)
pub const GOLDEN_RATIO: u32 = 0x9E37_79B9;

/// Number of Feistel rounds
pub const ROUNDS: u32 = 32;

/// Cipher block size in bytes
pub const BLOCK_SIZE: usize = 8;

/// Number of 32-bit words in a key
pub const KEY_WORDS: usize = 4;

/// A 128-bit XTEA key.
///
/// The all-zero key means "no encryption": [`XteaKey::encipher`] and
/// [`XteaKey::decipher`] still work with it, but the codecs check
/// [`XteaKey::is_zero`] and skip the cipher entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct XteaKey([u32; KEY_WORDS]);

impl XteaKey {
    /// The all-zero key
    pub const ZERO: Self = Self([0; KEY_WORDS]);

    /// Create a key from four unsigned words
    pub const fn new(words: [u32; KEY_WORDS]) -> Self {
        Self(words)
    }

    /// Create a key from four signed words.
    ///
    /// Key tables are commonly published as signed 32-bit integers.
    pub const fn from_signed(words: [i32; KEY_WORDS]) -> Self {
        Self([
            words[0] as u32,
            words[1] as u32,
            words[2] as u32,
            words[3] as u32,
        ])
    }

    /// Create a key from a slice of words.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeySize` if the slice does not hold
    /// exactly four words.
    pub fn from_slice(words: &[u32]) -> Result<Self, CryptoError> {
        let words: [u32; KEY_WORDS] =
            words.try_into().map_err(|_| CryptoError::InvalidKeySize {
                expected: KEY_WORDS,
                actual: words.len(),
            })?;
        Ok(Self(words))
    }

    /// The raw key words
    pub const fn words(&self) -> [u32; KEY_WORDS] {
        self.0
    }

    /// Whether this is the "no encryption" key
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Encipher every complete 8-byte block of `data` in place.
    pub fn encipher(&self, data: &mut [u8]) {
        let k = &self.0;
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let (mut v0, mut v1) = load(block);
            let mut sum = 0u32;
            for _ in 0..ROUNDS {
                v0 = v0.wrapping_add(
                    (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                        ^ sum.wrapping_add(k[(sum & 3) as usize]),
                );
                sum = sum.wrapping_add(GOLDEN_RATIO);
                v1 = v1.wrapping_add(
                    (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                        ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]),
                );
            }
            store(block, v0, v1);
        }
    }

    /// Decipher every complete 8-byte block of `data` in place.
    pub fn decipher(&self, data: &mut [u8]) {
        let k = &self.0;
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let (mut v0, mut v1) = load(block);
            let mut sum = GOLDEN_RATIO.wrapping_mul(ROUNDS);
            for _ in 0..ROUNDS {
                v1 = v1.wrapping_sub(
                    (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                        ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]),
                );
                sum = sum.wrapping_sub(GOLDEN_RATIO);
                v0 = v0.wrapping_sub(
                    (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                        ^ sum.wrapping_add(k[(sum & 3) as usize]),
                );
            }
            store(block, v0, v1);
        }
    }
}

impl From<[u32; KEY_WORDS]> for XteaKey {
    fn from(words: [u32; KEY_WORDS]) -> Self {
        Self(words)
    }
}

impl From<[i32; KEY_WORDS]> for XteaKey {
    fn from(words: [i32; KEY_WORDS]) -> Self {
        Self::from_signed(words)
    }
}

#[inline]
fn load(block: &[u8]) -> (u32, u32) {
    (
        u32::from_be_bytes([block[0], block[1], block[2], block[3]]),
        u32::from_be_bytes([block[4], block[5], block[6], block[7]]),
    )
}

#[inline]
fn store(block: &mut [u8], v0: u32, v1: u32) {
    block[..4].copy_from_slice(&v0.to_be_bytes());
    block[4..8].copy_from_slice(&v1.to_be_bytes());
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reference_key() -> XteaKey {
        XteaKey::new([0x0001_0203, 0x0405_0607, 0x0809_0a0b, 0x0c0d_0e0f])
    }

    #[test]
    fn test_known_vector() {
        let mut block = *b"ABCDEFGH";
        reference_key().encipher(&mut block);
        assert_eq!(block, [0x49, 0x7d, 0xf3, 0xd0, 0x72, 0x61, 0x2c, 0xb5]);

        reference_key().decipher(&mut block);
        assert_eq!(&block, b"ABCDEFGH");
    }

    #[test]
    fn test_trailing_partial_block_untouched() {
        let key = XteaKey::new([9, 8, 7, 6]);
        let mut data = *b"0123456789abc";
        key.encipher(&mut data);
        assert_ne!(&data[..8], b"01234567");
        assert_eq!(&data[8..], b"89abc");
    }

    #[test]
    fn test_short_input_untouched() {
        let key = XteaKey::new([1, 1, 1, 1]);
        let mut data = [1u8, 2, 3];
        key.decipher(&mut data);
        assert_eq!(data, [1, 2, 3]);
    }

    #[test]
    fn test_wrong_key_does_not_recover() {
        let mut data = *b"secret payload!!";
        reference_key().encipher(&mut data);
        XteaKey::new([1, 2, 3, 4]).decipher(&mut data);
        assert_ne!(&data, b"secret payload!!");
    }

    #[test]
    fn test_zero_key() {
        assert!(XteaKey::ZERO.is_zero());
        assert!(XteaKey::default().is_zero());
        assert!(!XteaKey::new([0, 0, 0, 1]).is_zero());
    }

    #[test]
    fn test_from_signed() {
        let key = XteaKey::from_signed([-1, 0, i32::MIN, 1]);
        assert_eq!(key.words(), [u32::MAX, 0, 0x8000_0000, 1]);
        assert_eq!(XteaKey::from([-1i32, 0, i32::MIN, 1]), key);
    }

    #[test]
    fn test_from_slice() {
        let key = XteaKey::from_slice(&[1, 2, 3, 4]).unwrap();
        assert_eq!(key.words(), [1, 2, 3, 4]);

        let err = XteaKey::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeySize {
                expected: 4,
                actual: 3
            }
        );
    }
}
