//! Cryptographic operations for the runecache storage format
//!
//! Archive payloads may be enciphered with XTEA, a 64-bit block Feistel
//! cipher keyed by four 32-bit words. The all-zero key is the sentinel for
//! "not enciphered" throughout the cache, so callers can pass
//! [`XteaKey::ZERO`] unconditionally and let the codecs skip the cipher.
//!
//! # Examples
//!
//! ```
//! use runecache_crypto::XteaKey;
//!
//! let key = XteaKey::new([1, 2, 3, 4]);
//! let mut data = *b"sixteen byte msg";
//! key.encipher(&mut data);
//! assert_ne!(&data, b"sixteen byte msg");
//!
//! key.decipher(&mut data);
//! assert_eq!(&data, b"sixteen byte msg");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod xtea;

pub use error::CryptoError;
pub use xtea::XteaKey;
