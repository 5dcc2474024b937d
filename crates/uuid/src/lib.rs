//! Resource and bundle identifiers.
//!
//! Every resource the engine synthesises, and every bundle it writes, carries a freshly
//! generated random identifier. Bundles are later addressed by that identifier through a
//! file-naming convention, so identifiers supplied from outside (REST path segments, CLI
//! arguments) must be validated before they are ever joined onto a filesystem path.
//!
//! ## Canonical form
//! - Hyphenated RFC 4122 layout, 36 characters
//! - Lowercase hex digits only
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! This is the form `Uuid::new_v4().hyphenated().to_string()` produces. Uppercase, simple
//! (unhyphenated) and braced forms are rejected rather than normalised, which keeps the
//! mapping from identifier to file name one-to-one.

mod id;

pub use id::{ResourceId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
