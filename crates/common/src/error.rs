//! Common error types shared across crates.

use std::fmt;

use thiserror::Error;

/// The codec operation that was running when a crypto failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Encrypt => f.write_str("encrypt"),
            Operation::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Top-level codec error type.
///
/// Variants map to process exit codes used by the CLI:
/// - [`KryptError::InvalidArgument`] → 2
/// - [`KryptError::CryptoFailure`] → 1
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KryptError {
    /// The caller supplied missing or malformed input: no value, no secret,
    /// unparseable JSON, or an envelope without `iv`, `salt` and `value`.
    #[error("{0}")]
    InvalidArgument(String),

    /// Key derivation or the block cipher failed.
    #[error("unable to {operation} value due to: {cause}")]
    CryptoFailure { operation: Operation, cause: String },
}

impl KryptError {
    /// Shorthand for an [`KryptError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        KryptError::InvalidArgument(message.into())
    }

    /// Wrap an underlying primitive error as a [`KryptError::CryptoFailure`].
    pub fn crypto(operation: Operation, cause: impl fmt::Display) -> Self {
        KryptError::CryptoFailure {
            operation,
            cause: cause.to_string(),
        }
    }

    /// Returns the process exit code the CLI should use for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            KryptError::InvalidArgument(_) => 2,
            KryptError::CryptoFailure { .. } => 1,
        }
    }
}
