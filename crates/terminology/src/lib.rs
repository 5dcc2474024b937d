//! # CodeBridge Terminology
//!
//! Resolves a disease name, or a code in any supported coding system, to the full row of
//! equivalent codes from a reference table.
//!
//! - [`TerminologyTable`] loads the reference table from the first usable candidate source
//! - [`CodeMapper`] answers lookups against it
//! - [`CodeSystems`] maps each [`CodeSystem`] to the URI emitted in codings
//!
//! Lookups are best effort by contract. An absent table, a missing column and an unmatched
//! key all produce `None`, never an error: callers treat a miss as a normal outcome.

mod resolver;
mod systems;
mod table;

pub use resolver::{CodeMapper, MappingQuery, MappingResult};
pub use systems::{CodeSystem, CodeSystems, DISEASE_COLUMN_ALIASES};
pub use table::{TerminologyTable, DEFAULT_CANDIDATES};

use std::path::PathBuf;

/// Errors raised while loading a single terminology source.
#[derive(Debug, thiserror::Error)]
pub enum TerminologyError {
    #[error("terminology source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("failed to read terminology source: {0}")]
    Ingest(#[from] codebridge_ingest::IngestError),
}

/// Result type for terminology loading.
pub type TerminologyResult<T> = Result<T, TerminologyError>;
