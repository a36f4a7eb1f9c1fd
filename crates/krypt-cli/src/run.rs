//! File-to-envelope and envelope-to-file operations.
//!
//! For each invocation the CLI:
//! 1. Reads the input file as UTF-8.
//! 2. Encrypts it into a pretty-printed JSON envelope, or decrypts an
//!    envelope back to text.
//! 3. Writes the result to `--out` or stdout.

use std::path::Path;

use anyhow::{Context, Result};
use krypt::EnvelopeCodec;
use tokio::io::{self, AsyncWriteExt};
use tracing::{debug, info};

use crate::cli::Mode;

/// Run one encrypt or decrypt operation.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the codec fails, or the
/// output cannot be written. Codec failures keep their [`krypt::KryptError`]
/// so that the caller can map them to an exit code.
pub async fn run(mode: Mode<'_>, out: Option<&Path>, codec: &EnvelopeCodec) -> Result<()> {
    match mode {
        Mode::Encrypt(path) => {
            let input = read_input(path).await?;
            let envelope = codec.encrypt_async(&input, None).await?;
            let json = envelope
                .to_json_pretty()
                .context("failed to serialise envelope")?;
            info!(path = %path.display(), "file encrypted");
            write_output(out, &json).await
        }
        Mode::Decrypt(path) => {
            let input = read_input(path).await?;
            let plaintext = codec.decrypt_async(input.as_str(), None).await?;
            info!(path = %path.display(), "file decrypted");
            write_output(out, &plaintext).await
        }
    }
}

async fn read_input(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(path = %path.display(), bytes = text.len(), "input read");
    Ok(text)
}

/// Write to `out` verbatim, or to stdout followed by a newline.
async fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => {
            tokio::fs::write(path, contents)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), bytes = contents.len(), "output written");
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(contents.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
