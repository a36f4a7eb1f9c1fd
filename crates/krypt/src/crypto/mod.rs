//! Cryptographic primitives used by the envelope codec.
//!
//! This module is intentionally free of envelope and configuration types.
//! It provides the low-level operations the codec composes:
//!
//! - [`kdf`]: PBKDF2-HMAC key derivation over a selectable [`Digest`].
//! - [`cipher`]: AES-256-CBC with PKCS#7 padding.
//! - [`mac`]: the optional HMAC-SHA256 integrity tag.
//! - [`random`]: the secure random source for salts and IVs.

pub mod cipher;
pub mod kdf;
pub mod mac;
pub mod random;

pub use cipher::{IV_LEN, KEY_LEN};
pub use kdf::{DerivedKey, Digest};
pub use random::{OsRandom, RandomSource};
