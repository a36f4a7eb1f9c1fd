//! The envelope codec: password-based encryption into self-describing envelopes.
//!
//! # Flow
//!
//! ```text
//! encrypt: validate → snapshot settings → draw salt + IV → PBKDF2 → AES-256-CBC → Envelope
//! decrypt: validate → snapshot settings → parse → resolve params → PBKDF2 → AES-256-CBC → String
//! ```
//!
//! Each operation comes in a blocking form and an `async` form. Both share
//! the same preparation and finishing steps; the async form only moves the
//! PBKDF2 call onto Tokio's blocking pool. The cipher step then runs in the
//! same continuation. A failed derivation returns without touching the
//! cipher.
//!
//! # Invariants
//!
//! - The secret, plaintext and key material never appear in logs.
//! - Parameters recorded in an envelope are exactly those used for it.
//! - Encryption never changes the codec settings.

pub mod params;
pub mod settings;

use std::{borrow::Cow, fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{
    envelope::MISSING_FIELDS_ERROR,
    Envelope, KryptError, Operation,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::crypto::{
    cipher,
    kdf::{self, DerivedKey, Digest, KdfError},
    mac, OsRandom, RandomSource, IV_LEN,
};

pub use params::{DecryptInput, KeyParams};
pub use settings::{CodecSettings, SettingsStore};

/// Message for an empty value passed to encrypt.
pub const VALUE_TO_ENCRYPT_REQUIRED: &str = "value to encrypt is required";

/// Message when encrypt cannot resolve a secret.
pub const SECRET_TO_ENCRYPT_REQUIRED: &str = "a secret is required to encrypt";

/// Message for empty input passed to decrypt.
pub const VALUE_TO_DECRYPT_REQUIRED: &str = "value to decrypt is required";

/// Message when decrypt cannot resolve a secret.
pub const SECRET_TO_DECRYPT_REQUIRED: &str = "a secret is required to decrypt";

/// Encrypts values into [`Envelope`]s and decrypts them again.
///
/// Cheap to clone; clones share one [`SettingsStore`], so a setter called
/// through any clone affects every call that starts afterwards.
pub struct EnvelopeCodec<R = OsRandom> {
    store: SettingsStore,
    rng: Arc<R>,
}

impl<R> Clone for EnvelopeCodec<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            rng: Arc::clone(&self.rng),
        }
    }
}

impl<R> fmt::Debug for EnvelopeCodec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("settings", &self.store.snapshot())
            .finish_non_exhaustive()
    }
}

impl EnvelopeCodec<OsRandom> {
    /// Create a codec drawing salts and IVs from the OS CSPRNG.
    pub fn new(settings: CodecSettings) -> Self {
        Self::with_random(settings, OsRandom)
    }
}

impl Default for EnvelopeCodec<OsRandom> {
    fn default() -> Self {
        Self::new(CodecSettings::default())
    }
}

impl<R: RandomSource> EnvelopeCodec<R> {
    /// Create a codec with a specific random source.
    pub fn with_random(settings: CodecSettings, rng: R) -> Self {
        Self {
            store: SettingsStore::new(settings),
            rng: Arc::new(rng),
        }
    }

    /// The current settings snapshot.
    pub fn settings(&self) -> Arc<CodecSettings> {
        self.store.snapshot()
    }

    /// Atomically replace every setting at once.
    pub fn replace_settings(&self, settings: CodecSettings) {
        self.store.replace(settings);
    }

    pub fn set_iterations(&self, iterations: u32) {
        self.store.update(|s| s.iterations = iterations);
    }

    /// Set the key length in bits. `32` is read as the legacy byte form.
    pub fn set_key_length(&self, key_length: u32) {
        self.store.update(|s| s.key_length = key_length);
    }

    pub fn set_digest(&self, digest: Digest) {
        self.store.update(|s| s.digest = digest);
    }

    /// Set the secret used when a call does not pass one.
    pub fn set_secret(&self, secret: impl Into<String>) {
        let secret = secret.into();
        self.store.update(|s| s.secret = Some(secret.clone()));
    }

    /// Set extra fields merged into every new envelope. Core fields always win.
    pub fn set_context(&self, context: Map<String, Value>) {
        self.store.update(|s| s.context = context.clone());
    }

    /// Enable or disable the HMAC integrity tag on new envelopes.
    pub fn set_authenticate(&self, authenticate: bool) {
        self.store.update(|s| s.authenticate = authenticate);
    }

    /// Encrypt `plaintext`, blocking for the key derivation.
    ///
    /// `secret` overrides the configured default secret.
    ///
    /// # Errors
    ///
    /// [`KryptError::InvalidArgument`] for an empty value or no resolvable
    /// secret; [`KryptError::CryptoFailure`] if derivation, random generation
    /// or the cipher fails.
    pub fn encrypt(&self, plaintext: &str, secret: Option<&str>) -> Result<Envelope, KryptError> {
        let (derivation, seal) = self.prepare_encrypt(plaintext, secret)?;
        let key = derivation
            .run()
            .map_err(|e| KryptError::crypto(Operation::Encrypt, e))?;
        seal.finish(&key)
    }

    /// Encrypt `plaintext` without blocking the calling task during key
    /// derivation. Must be called from within a Tokio runtime.
    ///
    /// Produces the same result shape and errors as [`Self::encrypt`].
    pub async fn encrypt_async(
        &self,
        plaintext: &str,
        secret: Option<&str>,
    ) -> Result<Envelope, KryptError> {
        let (derivation, seal) = self.prepare_encrypt(plaintext, secret)?;
        let key = derive_off_thread(derivation, Operation::Encrypt).await?;
        seal.finish(&key)
    }

    /// Decrypt an envelope or its JSON encoding, blocking for the key
    /// derivation.
    ///
    /// # Errors
    ///
    /// [`KryptError::InvalidArgument`] for empty input, no resolvable secret,
    /// unparseable JSON or missing `iv`/`salt`/`value`;
    /// [`KryptError::CryptoFailure`] for any derivation, integrity or cipher
    /// failure, including most wrong-secret attempts.
    pub fn decrypt<'a>(
        &self,
        input: impl Into<DecryptInput<'a>>,
        secret: Option<&str>,
    ) -> Result<String, KryptError> {
        let (derivation, open) = self.prepare_decrypt(input.into(), secret)?;
        let key = derivation
            .run()
            .map_err(|e| KryptError::crypto(Operation::Decrypt, e))?;
        open.finish(&key)
    }

    /// Decrypt without blocking the calling task during key derivation.
    /// Must be called from within a Tokio runtime.
    pub async fn decrypt_async<'a>(
        &self,
        input: impl Into<DecryptInput<'a>>,
        secret: Option<&str>,
    ) -> Result<String, KryptError> {
        let (derivation, open) = self.prepare_decrypt(input.into(), secret)?;
        let key = derive_off_thread(derivation, Operation::Decrypt).await?;
        open.finish(&key)
    }

    fn prepare_encrypt<'p>(
        &self,
        plaintext: &'p str,
        secret: Option<&str>,
    ) -> Result<(Derivation, Seal<'p>), KryptError> {
        if plaintext.is_empty() {
            return Err(KryptError::invalid(VALUE_TO_ENCRYPT_REQUIRED));
        }

        let settings = self.store.snapshot();
        let secret = settings
            .resolve_secret(secret)
            .ok_or_else(|| KryptError::invalid(SECRET_TO_ENCRYPT_REQUIRED))?
            .as_bytes()
            .to_vec();

        let fail = |e: &dyn fmt::Display| KryptError::crypto(Operation::Encrypt, e);
        let params = KeyParams::for_encrypt(&settings);
        let key_len = params.key_len_bytes().map_err(|e| fail(&e))?;

        let mut salt = vec![0u8; key_len];
        let mut iv = [0u8; IV_LEN];
        self.rng.fill(&mut salt).map_err(|e| fail(&e))?;
        self.rng.fill(&mut iv).map_err(|e| fail(&e))?;

        let seal = Seal {
            plaintext,
            salt: STANDARD.encode(&salt),
            iv,
            params,
            settings,
        };
        let derivation = Derivation {
            secret,
            salt,
            key_len,
            params,
        };
        Ok((derivation, seal))
    }

    fn prepare_decrypt(
        &self,
        input: DecryptInput<'_>,
        secret: Option<&str>,
    ) -> Result<(Derivation, Open), KryptError> {
        if input.is_missing() {
            return Err(KryptError::invalid(VALUE_TO_DECRYPT_REQUIRED));
        }

        let settings = self.store.snapshot();
        let secret = settings
            .resolve_secret(secret)
            .ok_or_else(|| KryptError::invalid(SECRET_TO_DECRYPT_REQUIRED))?
            .as_bytes()
            .to_vec();

        let envelope: Cow<'_, Envelope> = match input {
            DecryptInput::Envelope(envelope) => envelope,
            DecryptInput::Text(text) => Cow::Owned(Envelope::from_json(&text)?),
            DecryptInput::Json(value) => Cow::Owned(Envelope::from_value(value)?),
        };
        if !envelope.has_required_fields() {
            return Err(KryptError::invalid(MISSING_FIELDS_ERROR));
        }

        let fail = |e: &dyn fmt::Display| KryptError::crypto(Operation::Decrypt, e);
        let params = KeyParams::for_decrypt(&envelope, &settings).map_err(|e| fail(&e))?;
        let key_len = params.key_len_bytes().map_err(|e| fail(&e))?;
        if envelope.digest.is_none() {
            debug!(digest = %params.digest, "envelope records no digest; using deprecated default");
        }

        let salt = decode_field("salt", &envelope.salt)?;
        let iv = decode_field("iv", &envelope.iv)?;
        let ciphertext = decode_field("value", &envelope.value)?;
        let mac = envelope
            .mac
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(|m| decode_field("mac", m))
            .transpose()?;

        let open = Open {
            iv,
            ciphertext,
            mac,
            params,
        };
        let derivation = Derivation {
            secret,
            salt,
            key_len,
            params,
        };
        Ok((derivation, open))
    }
}

/// Run PBKDF2 on Tokio's blocking pool.
async fn derive_off_thread(
    derivation: Derivation,
    operation: Operation,
) -> Result<DerivedKey, KryptError> {
    tokio::task::spawn_blocking(move || derivation.run())
        .await
        .map_err(|e| KryptError::crypto(operation, format!("key derivation task failed: {e}")))?
        .map_err(|e| KryptError::crypto(operation, e))
}

fn decode_field(name: &str, encoded: &str) -> Result<Vec<u8>, KryptError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| KryptError::crypto(Operation::Decrypt, format!("invalid base64 in {name}: {e}")))
}

/// Everything the key derivation needs. Owned so it can move to another thread.
struct Derivation {
    secret: Vec<u8>,
    salt: Vec<u8>,
    key_len: usize,
    params: KeyParams,
}

impl Derivation {
    fn run(&self) -> Result<DerivedKey, KdfError> {
        kdf::derive_key(
            &self.secret,
            &self.salt,
            self.params.iterations,
            self.key_len,
            self.params.digest,
        )
    }
}

impl Drop for Derivation {
    fn drop(&mut self) {
        self.secret.iter_mut().for_each(|b| *b = 0);
    }
}

/// The cipher half of an encryption, run once the key is available.
struct Seal<'p> {
    plaintext: &'p str,
    salt: String,
    iv: [u8; IV_LEN],
    params: KeyParams,
    settings: Arc<CodecSettings>,
}

impl Seal<'_> {
    fn finish(self, key: &DerivedKey) -> Result<Envelope, KryptError> {
        let fail = |e: &dyn fmt::Display| KryptError::crypto(Operation::Encrypt, e);
        let ciphertext =
            cipher::encrypt(key.as_bytes(), &self.iv, self.plaintext.as_bytes()).map_err(|e| fail(&e))?;

        let mac = if self.settings.authenticate {
            let tag = mac::tag(key.as_bytes(), &self.iv, &ciphertext).map_err(|e| fail(&e))?;
            Some(STANDARD.encode(tag))
        } else {
            None
        };

        let mut envelope = Envelope {
            cipher: Some(settings::CIPHER.to_owned()),
            key_derivation: Some(settings::KEY_DERIVATION.to_owned()),
            key_length: Some(self.params.key_length),
            iterations: Some(self.params.iterations),
            digest: Some(self.params.digest.to_string()),
            iv: STANDARD.encode(self.iv),
            salt: self.salt,
            value: STANDARD.encode(&ciphertext),
            mac,
            context: Map::new(),
        };
        envelope.merge_context(&self.settings.context);

        debug!(
            iterations = self.params.iterations,
            key_length = self.params.key_length,
            digest = %self.params.digest,
            authenticated = envelope.mac.is_some(),
            "value encrypted"
        );
        Ok(envelope)
    }
}

/// The cipher half of a decryption, run once the key is available.
struct Open {
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    mac: Option<Vec<u8>>,
    params: KeyParams,
}

impl Open {
    fn finish(self, key: &DerivedKey) -> Result<String, KryptError> {
        let fail = |e: &dyn fmt::Display| KryptError::crypto(Operation::Decrypt, e);
        if let Some(expected) = &self.mac {
            mac::verify(key.as_bytes(), &self.iv, &self.ciphertext, expected).map_err(|e| fail(&e))?;
        }
        let plaintext =
            cipher::decrypt_to_string(key.as_bytes(), &self.iv, &self.ciphertext).map_err(|e| fail(&e))?;

        debug!(
            iterations = self.params.iterations,
            key_length = self.params.key_length,
            digest = %self.params.digest,
            authenticated = self.mac.is_some(),
            "value decrypted"
        );
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random::{MockRandomSource, RandomError};
    use serde_json::json;

    const PLAIN_TEXT: &str = "This is my text!";
    const SECRET: &str = "A59C60BCF422D";

    fn fast_settings() -> CodecSettings {
        CodecSettings {
            iterations: 1000,
            ..CodecSettings::default()
        }
    }

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::new(fast_settings())
    }

    /// Salt bytes are all 7, IV bytes all 9.
    fn fixed_random() -> MockRandomSource {
        let mut rng = MockRandomSource::new();
        rng.expect_fill().returning(|dest: &mut [u8]| {
            let byte = if dest.len() == IV_LEN { 9 } else { 7 };
            dest.fill(byte);
            Ok(())
        });
        rng
    }

    #[test]
    fn encrypt_produces_complete_envelope() {
        let env = codec().encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert_eq!(env.cipher.as_deref(), Some("aes-256-cbc"));
        assert_eq!(env.key_derivation.as_deref(), Some("pbkdf2"));
        assert_eq!(env.key_length, Some(256));
        assert_eq!(env.iterations, Some(1000));
        assert_eq!(env.digest.as_deref(), Some("sha512"));
        assert!(env.has_required_fields());
        assert!(env.mac.is_none());
        assert_eq!(STANDARD.decode(&env.salt).unwrap().len(), 32);
        assert_eq!(STANDARD.decode(&env.iv).unwrap().len(), IV_LEN);
    }

    #[test]
    fn fixed_salt_and_iv_match_reference_output() {
        let codec = EnvelopeCodec::with_random(fast_settings(), fixed_random());
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert_eq!(env.salt, "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=");
        assert_eq!(env.iv, "CQkJCQkJCQkJCQkJCQkJCQ==");
        assert_eq!(env.value, "kaY1zc9EGwoempI7KrH5jjnIOWrdvzduagS21DDID1c=");
    }

    #[test]
    fn random_source_failure_is_crypto_failure() {
        let mut rng = MockRandomSource::new();
        rng.expect_fill()
            .times(1)
            .returning(|_: &mut [u8]| Err(RandomError("entropy unavailable".into())));
        let codec = EnvelopeCodec::with_random(fast_settings(), rng);
        let err = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap_err();
        assert!(matches!(
            err,
            KryptError::CryptoFailure { operation: Operation::Encrypt, .. }
        ));
    }

    #[test]
    fn round_trip_envelope_and_json() {
        let codec = codec();
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert_eq!(codec.decrypt(&env, Some(SECRET)).unwrap(), PLAIN_TEXT);
        let json = env.to_json().unwrap();
        assert_eq!(codec.decrypt(json.as_str(), Some(SECRET)).unwrap(), PLAIN_TEXT);
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(codec.decrypt(value, Some(SECRET)).unwrap(), PLAIN_TEXT);
    }

    #[test]
    fn empty_value_rejected() {
        let err = codec().encrypt("", Some(SECRET)).unwrap_err();
        assert_eq!(err, KryptError::invalid(VALUE_TO_ENCRYPT_REQUIRED));
    }

    #[test]
    fn missing_secret_rejected() {
        let err = codec().encrypt(PLAIN_TEXT, None).unwrap_err();
        assert_eq!(err, KryptError::invalid(SECRET_TO_ENCRYPT_REQUIRED));
        let err = codec().decrypt(r#"{"iv":"a","salt":"b","value":"c"}"#, None).unwrap_err();
        assert_eq!(err, KryptError::invalid(SECRET_TO_DECRYPT_REQUIRED));
    }

    #[test]
    fn value_is_checked_before_secret() {
        let err = codec().encrypt("", None).unwrap_err();
        assert_eq!(err, KryptError::invalid(VALUE_TO_ENCRYPT_REQUIRED));
        let err = codec().decrypt("", None).unwrap_err();
        assert_eq!(err, KryptError::invalid(VALUE_TO_DECRYPT_REQUIRED));
    }

    #[test]
    fn default_secret_used_when_none_given() {
        let codec = codec();
        codec.set_secret(SECRET);
        let env = codec.encrypt(PLAIN_TEXT, None).unwrap();
        assert_eq!(codec.decrypt(&env, None).unwrap(), PLAIN_TEXT);
        assert_eq!(codec.decrypt(&env, Some(SECRET)).unwrap(), PLAIN_TEXT);
    }

    #[test]
    fn unparseable_text_rejected() {
        let err = codec().decrypt("not json at all", Some(SECRET)).unwrap_err();
        assert_eq!(err, KryptError::invalid("unable to parse input as JSON"));
    }

    #[test]
    fn each_required_field_is_checked() {
        let codec = codec();
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        for field in ["iv", "salt", "value"] {
            let mut value = serde_json::to_value(&env).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let err = codec.decrypt(value, Some(SECRET)).unwrap_err();
            assert_eq!(err, KryptError::invalid(MISSING_FIELDS_ERROR), "field {field}");
        }
    }

    #[test]
    fn wrong_secret_never_returns_plaintext() {
        let codec = codec();
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        match codec.decrypt(&env, Some("not the secret")) {
            Ok(text) => assert_ne!(text, PLAIN_TEXT),
            Err(e) => assert!(matches!(
                e,
                KryptError::CryptoFailure { operation: Operation::Decrypt, .. }
            )),
        }
    }

    #[test]
    fn corrupt_base64_is_crypto_failure() {
        let codec = codec();
        let mut env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        env.iv = "***".into();
        let err = codec.decrypt(&env, Some(SECRET)).unwrap_err();
        assert!(err.to_string().starts_with("unable to decrypt value due to: invalid base64 in iv"));
    }

    #[test]
    fn unknown_digest_in_envelope_is_crypto_failure() {
        let codec = codec();
        let mut env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        env.digest = Some("md4".into());
        let err = codec.decrypt(&env, Some(SECRET)).unwrap_err();
        assert_eq!(err.to_string(), "unable to decrypt value due to: unsupported digest: md4");
    }

    #[test]
    fn null_required_fields_are_reported_as_missing() {
        let codec = codec();
        for json in [
            r#"{"iv":null,"salt":"b","value":"c"}"#,
            r#"{"iv":"a","salt":null,"value":"c"}"#,
            r#"{"iv":"a","salt":"b","value":null}"#,
        ] {
            assert_eq!(
                codec.decrypt(json, Some(SECRET)).unwrap_err(),
                KryptError::invalid(MISSING_FIELDS_ERROR),
                "{json}"
            );
        }
    }

    #[test]
    fn envelope_text_inside_a_json_string_is_parsed() {
        let codec = codec();
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        let wrapped = Value::String(env.to_json().unwrap());
        assert_eq!(codec.decrypt(wrapped, Some(SECRET)).unwrap(), PLAIN_TEXT);
        assert_eq!(
            codec.decrypt(Value::String(String::new()), Some(SECRET)).unwrap_err(),
            KryptError::invalid(VALUE_TO_DECRYPT_REQUIRED)
        );
    }

    #[test]
    fn legacy_key_length_setting_is_not_mutated() {
        let codec = codec();
        codec.set_key_length(32);
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert_eq!(env.key_length, Some(256));
        assert_eq!(STANDARD.decode(&env.salt).unwrap().len(), 32);
        assert_eq!(codec.settings().key_length, 32);
        assert_eq!(codec.decrypt(&env, Some(SECRET)).unwrap(), PLAIN_TEXT);
    }

    #[test]
    fn unsupported_key_length_fails_before_drawing_salt() {
        let mut rng = MockRandomSource::new();
        rng.expect_fill().never();
        let codec = EnvelopeCodec::with_random(fast_settings(), rng);
        codec.set_key_length(128);
        let err = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap_err();
        assert_eq!(
            err,
            KryptError::crypto(Operation::Encrypt, "invalid key length: 128 bits")
        );
    }

    #[test]
    fn oversized_recorded_key_length_is_rejected_up_front() {
        let codec = codec();
        let mut env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        env.key_length = Some(536_870_912);
        env.iterations = Some(1);
        let err = codec.decrypt(&env, Some(SECRET)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to decrypt value due to: invalid key length: 536870912 bits"
        );
    }

    #[test]
    fn setters_affect_only_later_envelopes() {
        let codec = codec();
        let first = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        codec.set_iterations(1500);
        codec.set_digest(Digest::Sha256);
        let second = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert_eq!(first.iterations, Some(1000));
        assert_eq!(second.iterations, Some(1500));
        assert_eq!(second.digest.as_deref(), Some("sha256"));
        // Recorded parameters keep the older envelope decryptable.
        assert_eq!(codec.decrypt(&first, Some(SECRET)).unwrap(), PLAIN_TEXT);
        assert_eq!(codec.decrypt(&second, Some(SECRET)).unwrap(), PLAIN_TEXT);
    }

    #[test]
    fn context_is_merged_without_overwriting_core_fields() {
        let codec = codec();
        let context = json!({"app": "billing", "salt": "nope"});
        codec.set_context(context.as_object().unwrap().clone());
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert_eq!(env.context["app"], "billing");
        assert_ne!(env.salt, "nope");
        assert_eq!(codec.decrypt(&env, Some(SECRET)).unwrap(), PLAIN_TEXT);
    }

    #[test]
    fn authenticated_envelopes_detect_tampering() {
        let codec = codec();
        codec.set_authenticate(true);
        let env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        assert!(env.mac.is_some());
        assert_eq!(codec.decrypt(&env, Some(SECRET)).unwrap(), PLAIN_TEXT);

        let mut tampered = env.clone();
        let mut bytes = STANDARD.decode(&tampered.value).unwrap();
        bytes[0] ^= 0x01;
        tampered.value = STANDARD.encode(bytes);
        let err = codec.decrypt(&tampered, Some(SECRET)).unwrap_err();
        assert_eq!(err.to_string(), "unable to decrypt value due to: integrity check failed");
    }

    #[test]
    fn authenticate_setting_does_not_require_tags_on_old_envelopes() {
        let codec = codec();
        let plain = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        codec.set_authenticate(true);
        assert_eq!(codec.decrypt(&plain, Some(SECRET)).unwrap(), PLAIN_TEXT);
    }

    #[tokio::test]
    async fn async_round_trip() {
        let codec = codec();
        let env = codec.encrypt_async(PLAIN_TEXT, Some(SECRET)).await.unwrap();
        assert!(env.has_required_fields());
        let out = codec.decrypt_async(&env, Some(SECRET)).await.unwrap();
        assert_eq!(out, PLAIN_TEXT);
    }

    #[tokio::test]
    async fn async_and_blocking_forms_agree() {
        let codec = EnvelopeCodec::with_random(fast_settings(), fixed_random());
        let blocking = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        let non_blocking = codec.encrypt_async(PLAIN_TEXT, Some(SECRET)).await.unwrap();
        assert_eq!(blocking, non_blocking);
    }

    #[tokio::test]
    async fn async_reports_the_same_errors() {
        let codec = codec();
        assert_eq!(
            codec.encrypt_async("", Some(SECRET)).await.unwrap_err(),
            codec.encrypt("", Some(SECRET)).unwrap_err()
        );
        assert_eq!(
            codec.decrypt_async("{", Some(SECRET)).await.unwrap_err(),
            codec.decrypt("{", Some(SECRET)).unwrap_err()
        );
    }

    #[tokio::test]
    async fn async_derivation_failure_is_reported_without_sealing() {
        let codec = codec();
        codec.set_iterations(0);
        let err = codec.encrypt_async(PLAIN_TEXT, Some(SECRET)).await.unwrap_err();
        assert_eq!(
            err,
            KryptError::crypto(Operation::Encrypt, "iterations must be greater than zero")
        );
    }

    #[tokio::test]
    async fn async_rejects_invalid_recorded_key_length() {
        let codec = codec();
        let mut env = codec.encrypt(PLAIN_TEXT, Some(SECRET)).unwrap();
        env.key_length = Some(250);
        let err = codec.decrypt_async(&env, Some(SECRET)).await.unwrap_err();
        assert_eq!(err.to_string(), "unable to decrypt value due to: invalid key length: 250 bits");
    }
}
