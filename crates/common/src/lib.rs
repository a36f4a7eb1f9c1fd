//! Common types and errors shared across `krypt` crates.

pub mod envelope;
pub mod error;

pub use envelope::Envelope;
pub use error::{KryptError, Operation};
