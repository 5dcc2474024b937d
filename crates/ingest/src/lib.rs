//! # CodeBridge Ingest
//!
//! Reads tabular sources into a [`Table`] of named columns with optional cells.
//!
//! Both the terminology reference data and the clinical input rows arrive as spreadsheets or
//! delimited text whose headers vary in case, spacing and underscores. This crate flattens those
//! differences in one place:
//!
//! - headers are normalised with [`normalize_column`] (`"Condition Name"` → `"condition_name"`)
//! - column lookups compare [`column_key`]s, which also ignore underscores, so `"ICD 11"`,
//!   `"icd_11"` and `"Icd11"` all find the same column
//! - blank cells (missing, empty, whitespace-only) are stored as `None`
//!
//! Rows that cannot be read (wrong field count, invalid UTF-8) are kept aside as
//! [`RejectedRow`]s instead of failing the whole table.

mod reader;
mod table;

pub use reader::{read_delimited, read_table, SourceFormat, MAX_TABLE_FILE_SIZE};
pub use table::{column_key, normalize_column, RejectedRow, Table, TableRow};

use std::path::PathBuf;

/// Errors raised while reading a tabular source.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file too large: {path} ({size} bytes, max {max_size})")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    #[error("unsupported table format '{extension}': {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to parse delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("table has no header row")]
    NoHeader,
}

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;
