//! PBKDF2-HMAC key derivation.

use std::{fmt, str::FromStr};

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use thiserror::Error;

/// Errors produced by the key-derivation layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KdfError {
    /// The digest name is not one of the supported PBKDF2 digests.
    #[error("unsupported digest: {0}")]
    UnsupportedDigest(String),

    /// The key length is not a whole number of bytes or does not fit the cipher.
    #[error("invalid key length: {0} bits")]
    InvalidKeyLength(u32),

    /// PBKDF2 requires at least one iteration.
    #[error("iterations must be greater than zero")]
    ZeroIterations,
}

/// Hash function driving the PBKDF2 pseudo-random function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Digest {
    /// Deprecated. Only used to decrypt envelopes that do not record a digest.
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Digest {
    /// Canonical lowercase name as recorded in envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Digest::Sha1 => "sha1",
            Digest::Sha224 => "sha224",
            Digest::Sha256 => "sha256",
            Digest::Sha384 => "sha384",
            Digest::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Digest {
    type Err = KdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        [
            Digest::Sha1,
            Digest::Sha224,
            Digest::Sha256,
            Digest::Sha384,
            Digest::Sha512,
        ]
        .into_iter()
        .find(|d| d.as_str().eq_ignore_ascii_case(name))
        .ok_or_else(|| KdfError::UnsupportedDigest(s.to_owned()))
    }
}

/// Key material produced by [`derive_key`].
///
/// The bytes are overwritten with zeroes on drop and never printed.
pub struct DerivedKey(Vec<u8>);

impl DerivedKey {
    /// Borrow the raw key bytes. Use immediately; do not store or log.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for a zero-length key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Convert a key length in bits to whole bytes.
///
/// # Errors
///
/// Returns [`KdfError::InvalidKeyLength`] for zero or a non-multiple of 8.
pub fn key_len_bytes(bits: u32) -> Result<usize, KdfError> {
    if bits == 0 || bits % 8 != 0 {
        return Err(KdfError::InvalidKeyLength(bits));
    }
    Ok((bits / 8) as usize)
}

/// Stretch `secret` and `salt` into `key_len` bytes with PBKDF2-HMAC-`digest`.
///
/// Deterministic: the same inputs always produce the same key.
///
/// # Errors
///
/// Returns [`KdfError::ZeroIterations`] if `iterations` is zero and
/// [`KdfError::InvalidKeyLength`] if `key_len` is zero.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
    key_len: usize,
    digest: Digest,
) -> Result<DerivedKey, KdfError> {
    if iterations == 0 {
        return Err(KdfError::ZeroIterations);
    }
    if key_len == 0 {
        return Err(KdfError::InvalidKeyLength(0));
    }

    let mut out = vec![0u8; key_len];
    match digest {
        Digest::Sha1 => pbkdf2_hmac::<Sha1>(secret, salt, iterations, &mut out),
        Digest::Sha224 => pbkdf2_hmac::<Sha224>(secret, salt, iterations, &mut out),
        Digest::Sha256 => pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut out),
        Digest::Sha384 => pbkdf2_hmac::<Sha384>(secret, salt, iterations, &mut out),
        Digest::Sha512 => pbkdf2_hmac::<Sha512>(secret, salt, iterations, &mut out),
    }
    Ok(DerivedKey(out))
}
