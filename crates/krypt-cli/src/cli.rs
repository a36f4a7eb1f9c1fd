//! Command-line flags.

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser};

/// Encrypt or decrypt a text file with a password-derived key
#[derive(Debug, Parser)]
#[command(name = "krypt", version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["encrypt", "decrypt"])))]
pub struct Args {
    /// Path of file to encrypt
    #[arg(short, long, value_name = "PATH")]
    pub encrypt: Option<PathBuf>,

    /// Path of file to decrypt
    #[arg(short, long, value_name = "PATH")]
    pub decrypt: Option<PathBuf>,

    /// Secret used to encrypt/decrypt the file (falls back to KRYPT_SECRET)
    #[arg(short, long)]
    pub secret: Option<String>,

    /// Iterations to use for key stretching
    #[arg(short, long)]
    pub iterations: Option<u32>,

    /// Length of the derived key in bits (32 is read as bytes)
    #[arg(short, long)]
    pub length: Option<u32>,

    /// PBKDF2 digest: sha1, sha224, sha256, sha384 or sha512
    #[arg(long)]
    pub digest: Option<String>,

    /// Attach an HMAC integrity tag to the envelope
    #[arg(long)]
    pub authenticate: bool,

    /// File location to write the result to (stdout if omitted)
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// What the invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'a> {
    Encrypt(&'a Path),
    Decrypt(&'a Path),
}

impl Args {
    /// The requested mode.
    ///
    /// The required `mode` group means exactly one of the two paths is set.
    pub fn mode(&self) -> Mode<'_> {
        match (&self.encrypt, &self.decrypt) {
            (Some(path), _) => Mode::Encrypt(path),
            (None, path) => Mode::Decrypt(path.as_deref().unwrap_or(Path::new(""))),
        }
    }
}
