//! Secure random bytes for salts and initialization vectors.

use rand_core::{OsRng, RngCore};
use thiserror::Error;

/// The random source could not produce bytes.
#[derive(Debug, Error)]
#[error("secure random source failed: {0}")]
pub struct RandomError(pub String);

/// A source of cryptographically secure random bytes.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), RandomError>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| RandomError(e.to_string()))
    }
}
