//! Resolution of the key-derivation parameters for a single call.
//!
//! Fallback order for each parameter: the envelope's recorded value, then the
//! codec settings snapshot. The digest is the exception: an envelope without
//! one was written before digests were recorded and always resolves to
//! [`DEFAULT_DEPRECATED_DIGEST`].

use std::borrow::Cow;

use common::Envelope;
use serde_json::Value;

use super::settings::{key_length_bits, CodecSettings, DEFAULT_DEPRECATED_DIGEST};
use crate::crypto::{
    cipher::KEY_LEN,
    kdf::{key_len_bytes, Digest, KdfError},
};

/// Fully resolved parameters for one key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParams {
    /// Key length in bits, after the legacy byte shim.
    pub key_length: u32,
    pub iterations: u32,
    pub digest: Digest,
}

impl KeyParams {
    /// Parameters for a new envelope, taken from the settings snapshot.
    pub fn for_encrypt(settings: &CodecSettings) -> Self {
        Self {
            key_length: key_length_bits(settings.key_length),
            iterations: settings.iterations,
            digest: settings.digest,
        }
    }

    /// Parameters recorded in `envelope`, falling back to `settings`.
    ///
    /// Zero and empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`KdfError::UnsupportedDigest`] if the envelope names a digest
    /// this codec does not implement.
    pub fn for_decrypt(envelope: &Envelope, settings: &CodecSettings) -> Result<Self, KdfError> {
        let key_length = envelope
            .key_length
            .filter(|&n| n != 0)
            .unwrap_or(settings.key_length);
        let iterations = envelope
            .iterations
            .filter(|&n| n != 0)
            .unwrap_or(settings.iterations);
        let digest = match envelope.digest.as_deref().filter(|d| !d.is_empty()) {
            Some(name) => name.parse()?,
            None => DEFAULT_DEPRECATED_DIGEST,
        };
        Ok(Self {
            key_length: key_length_bits(key_length),
            iterations,
            digest,
        })
    }

    /// Key (and salt) length in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KdfError::InvalidKeyLength`] unless the length is exactly the
    /// AES-256 key size.
    pub fn key_len_bytes(&self) -> Result<usize, KdfError> {
        match key_len_bytes(self.key_length)? {
            KEY_LEN => Ok(KEY_LEN),
            _ => Err(KdfError::InvalidKeyLength(self.key_length)),
        }
    }
}

/// Anything `decrypt` accepts: an envelope value or its JSON encoding.
#[derive(Debug, Clone)]
pub enum DecryptInput<'a> {
    Envelope(Cow<'a, Envelope>),
    Text(Cow<'a, str>),
    Json(Value),
}

impl<'a> DecryptInput<'a> {
    /// `true` when there is nothing to decrypt at all.
    pub(crate) fn is_missing(&self) -> bool {
        match self {
            DecryptInput::Envelope(_) => false,
            DecryptInput::Text(text) => text.is_empty(),
            DecryptInput::Json(value) => value.is_null(),
        }
    }
}

impl From<Envelope> for DecryptInput<'static> {
    fn from(envelope: Envelope) -> Self {
        DecryptInput::Envelope(Cow::Owned(envelope))
    }
}

impl<'a> From<&'a Envelope> for DecryptInput<'a> {
    fn from(envelope: &'a Envelope) -> Self {
        DecryptInput::Envelope(Cow::Borrowed(envelope))
    }
}

impl<'a> From<&'a str> for DecryptInput<'a> {
    fn from(text: &'a str) -> Self {
        DecryptInput::Text(Cow::Borrowed(text))
    }
}

impl<'a> From<&'a String> for DecryptInput<'a> {
    fn from(text: &'a String) -> Self {
        DecryptInput::Text(Cow::Borrowed(text.as_str()))
    }
}

impl From<String> for DecryptInput<'static> {
    fn from(text: String) -> Self {
        DecryptInput::Text(Cow::Owned(text))
    }
}

/// A JSON string is treated as envelope text, not as an envelope.
impl From<Value> for DecryptInput<'static> {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => DecryptInput::Text(Cow::Owned(text)),
            other => DecryptInput::Json(other),
        }
    }
}
