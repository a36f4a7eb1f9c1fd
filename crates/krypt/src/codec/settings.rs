//! Codec defaults and the shared, atomically swapped settings store.
//!
//! Every encrypt or decrypt call loads one snapshot at entry and uses it to
//! completion. Setters publish a new snapshot; calls already running keep
//! the one they started with.

use std::{fmt, sync::Arc};

use arc_swap::ArcSwap;
use serde_json::{Map, Value};

use crate::crypto::Digest;

/// Symmetric cipher identifier recorded in every envelope.
pub const CIPHER: &str = "aes-256-cbc";

/// Key-derivation identifier recorded in every envelope.
pub const KEY_DERIVATION: &str = "pbkdf2";

/// Default PBKDF2 work factor.
pub const DEFAULT_ITERATIONS: u32 = 128_000;

/// Default derived-key length in bits.
pub const DEFAULT_KEY_LENGTH: u32 = 256;

/// Default PBKDF2 digest for new envelopes.
pub const DEFAULT_DIGEST: Digest = Digest::Sha512;

/// Digest assumed for envelopes that do not record one.
pub const DEFAULT_DEPRECATED_DIGEST: Digest = Digest::Sha1;

/// Key length that older envelopes recorded in bytes rather than bits.
pub const LEGACY_KEY_LENGTH: u32 = 32;

/// Interpret a resolved key length in bits, applying the legacy byte shim.
///
/// Exactly `32` is read as 32 bytes, i.e. 256 bits. Every other value is
/// already in bits. Applied once per call to the resolved value.
pub fn key_length_bits(key_length: u32) -> u32 {
    if key_length == LEGACY_KEY_LENGTH {
        key_length * 8
    } else {
        key_length
    }
}

/// One immutable configuration of the codec.
#[derive(Clone, PartialEq)]
pub struct CodecSettings {
    /// PBKDF2 work factor for new envelopes, and for envelopes that omit it.
    pub iterations: u32,
    /// Derived-key length in bits (`32` is accepted as the legacy byte form).
    pub key_length: u32,
    /// PBKDF2 digest for new envelopes.
    pub digest: Digest,
    /// Secret used when a call does not supply one.
    pub secret: Option<String>,
    /// Extra fields merged into every produced envelope.
    pub context: Map<String, Value>,
    /// Attach an HMAC-SHA256 tag to new envelopes.
    pub authenticate: bool,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            key_length: DEFAULT_KEY_LENGTH,
            digest: DEFAULT_DIGEST,
            secret: None,
            context: Map::new(),
            authenticate: false,
        }
    }
}

impl fmt::Debug for CodecSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSettings")
            .field("iterations", &self.iterations)
            .field("key_length", &self.key_length)
            .field("digest", &self.digest)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("context", &self.context)
            .field("authenticate", &self.authenticate)
            .finish()
    }
}

impl CodecSettings {
    /// Resolve the secret for a call: an explicit non-empty secret wins,
    /// otherwise the configured default if it is non-empty.
    pub fn resolve_secret<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit
            .filter(|s| !s.is_empty())
            .or_else(|| self.secret.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Shared store for the current [`CodecSettings`].
///
/// Backed by [`ArcSwap`] so readers never block and writers swap in a whole
/// new configuration at once.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    inner: Arc<ArcSwap<CodecSettings>>,
}

impl SettingsStore {
    /// Create a store holding `settings`.
    pub fn new(settings: CodecSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// Load the current configuration. Lock-free.
    pub fn snapshot(&self) -> Arc<CodecSettings> {
        self.inner.load_full()
    }

    /// Atomically replace the whole configuration.
    pub fn replace(&self, settings: CodecSettings) {
        self.inner.store(Arc::new(settings));
    }

    /// Apply `change` to a copy of the current configuration and publish it.
    ///
    /// `change` may run more than once if another writer races this one.
    pub fn update<F>(&self, change: F)
    where
        F: Fn(&mut CodecSettings),
    {
        self.inner.rcu(|current| {
            let mut next = CodecSettings::clone(current);
            change(&mut next);
            next
        });
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(CodecSettings::default())
    }
}
