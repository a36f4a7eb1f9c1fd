//! Configuration loading and validation for the CLI.
//!
//! Values are read from `KRYPT_*` environment variables and then overridden
//! by any command-line flag that was given.

use std::fmt;

use anyhow::{Context, Result};
use krypt::{CodecSettings, Digest, DEFAULT_DIGEST, DEFAULT_ITERATIONS, DEFAULT_KEY_LENGTH};
use serde::Deserialize;

use crate::cli::Args;

/// Validated CLI configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// PBKDF2 work factor for new envelopes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Derived key length in bits (`32` is the legacy byte form).
    #[serde(default = "default_key_length")]
    pub key_length: u32,

    /// PBKDF2 digest name for new envelopes.
    #[serde(default = "default_digest")]
    pub digest: String,

    /// Secret used to encrypt/decrypt. Supplying it by flag or env is required
    /// for every operation; the codec rejects the call otherwise.
    #[serde(default)]
    pub secret: Option<String>,

    /// Attach an HMAC integrity tag to new envelopes.
    #[serde(default)]
    pub authenticate: bool,

    /// Tracing log level (e.g. `"warn"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
fn default_key_length() -> u32 {
    DEFAULT_KEY_LENGTH
}
fn default_digest() -> String {
    DEFAULT_DIGEST.to_string()
}
fn default_log_level() -> String {
    "warn".into()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("iterations", &self.iterations)
            .field("key_length", &self.key_length)
            .field("digest", &self.digest)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("authenticate", &self.authenticate)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment, apply flag overrides, and
    /// validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn load(args: &Args) -> Result<Self> {
        let mut c = Self::from_env()?;
        c.apply_args(args);
        c.validate()?;
        Ok(c)
    }

    /// Load configuration from `KRYPT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("KRYPT").try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        cfg.try_deserialize()
            .context("failed to deserialise configuration")
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(iterations) = args.iterations {
            self.iterations = iterations;
        }
        if let Some(length) = args.length {
            self.key_length = length;
        }
        if let Some(digest) = &args.digest {
            self.digest = digest.clone();
        }
        if let Some(secret) = &args.secret {
            self.secret = Some(secret.clone());
        }
        if args.authenticate {
            self.authenticate = true;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            anyhow::bail!("iterations must be > 0");
        }
        if self.key_length == 0 {
            anyhow::bail!("key length must be > 0");
        }
        self.parsed_digest()?;
        if self.log_level.trim().is_empty() {
            anyhow::bail!("log level must not be empty");
        }
        Ok(())
    }

    fn parsed_digest(&self) -> Result<Digest> {
        self.digest
            .parse()
            .with_context(|| format!("invalid digest {:?}", self.digest))
    }

    /// Codec settings described by this configuration.
    pub fn codec_settings(&self) -> Result<CodecSettings> {
        Ok(CodecSettings {
            iterations: self.iterations,
            key_length: self.key_length,
            digest: self.parsed_digest()?,
            secret: self.secret.clone(),
            authenticate: self.authenticate,
            ..CodecSettings::default()
        })
    }
}
