//! HMAC-SHA256 integrity tag for authenticated envelopes.
//!
//! The tag covers `iv || ciphertext` and is keyed by a sub-key derived from
//! the encryption key, so the encryption key itself is never used as an
//! HMAC key.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation label for the MAC sub-key.
const MAC_KEY_LABEL: &[u8] = b"krypt envelope mac v1";

/// Byte length of an HMAC-SHA256 tag.
pub const TAG_LEN: usize = 32;

/// Errors produced by the MAC layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MacError {
    /// The tag did not match the envelope contents.
    #[error("integrity check failed")]
    Mismatch,

    /// HMAC rejected the key.
    #[error("invalid MAC key")]
    InvalidKey,
}

fn keyed(key: &[u8]) -> Result<HmacSha256, MacError> {
    let mut sub = HmacSha256::new_from_slice(key).map_err(|_| MacError::InvalidKey)?;
    sub.update(MAC_KEY_LABEL);
    let mac_key = sub.finalize().into_bytes();
    HmacSha256::new_from_slice(&mac_key).map_err(|_| MacError::InvalidKey)
}

/// Compute the tag over `iv || ciphertext`.
pub fn tag(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, MacError> {
    let mut mac = keyed(key)?;
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify `expected` against `iv || ciphertext` in constant time.
///
/// # Errors
///
/// Returns [`MacError::Mismatch`] if the tag is wrong or has the wrong length.
pub fn verify(key: &[u8], iv: &[u8], ciphertext: &[u8], expected: &[u8]) -> Result<(), MacError> {
    let mut mac = keyed(key)?;
    mac.update(iv);
    mac.update(ciphertext);
    mac.verify_slice(expected).map_err(|_| MacError::Mismatch)
}
