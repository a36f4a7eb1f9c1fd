//! Password-based envelope encryption for small payloads.
//!
//! A value is encrypted with AES-256-CBC under a key stretched from a secret
//! with PBKDF2, and returned as a self-describing [`Envelope`] that records
//! every parameter needed to decrypt it later, even after the codec's
//! defaults have changed.
//!
//! ```no_run
//! use krypt::{CodecSettings, EnvelopeCodec};
//!
//! let codec = EnvelopeCodec::new(CodecSettings::default());
//! let envelope = codec.encrypt("This is my text!", Some("A59C60BCF422D"))?;
//! let json = envelope.to_json_pretty().expect("envelope serialises");
//! assert_eq!(codec.decrypt(json.as_str(), Some("A59C60BCF422D"))?, "This is my text!");
//! # Ok::<(), krypt::KryptError>(())
//! ```
//!
//! # Compatibility
//!
//! - Envelopes without a `digest` field are decrypted with SHA-1.
//! - A key length of exactly `32` is the legacy byte form of 256 bits.
//! - Envelopes holding only `iv`, `salt` and `value` use the codec settings.

pub mod codec;
pub mod crypto;

pub use codec::{
    settings::{
        CIPHER, DEFAULT_DEPRECATED_DIGEST, DEFAULT_DIGEST, DEFAULT_ITERATIONS, DEFAULT_KEY_LENGTH,
        KEY_DERIVATION, LEGACY_KEY_LENGTH,
    },
    CodecSettings, DecryptInput, EnvelopeCodec,
};
pub use common::{Envelope, KryptError, Operation};
pub use crypto::{Digest, OsRandom, RandomSource};
