//! Constants used throughout the CodeBridge core crate.
//!
//! Path and filename conventions live here so the store, the service and the binaries agree on
//! them.

/// Default directory for bundle files when no explicit directory is configured.
pub const DEFAULT_BUNDLE_DATA_DIR: &str = "bundles";

/// Default directory for uploaded source tables.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Country emitted on a patient address when the input has none.
pub const DEFAULT_COUNTRY: &str = "US";

/// Prefix of bundle filenames; the bundle id and `.json` follow.
pub const BUNDLE_FILENAME_PREFIX: &str = "fhir_bundle_";

/// Extension of bundle and per-resource files.
pub const JSON_EXTENSION: &str = "json";

/// File extensions accepted for uploaded tables.
pub const UPLOAD_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "csv", "tsv"];

/// Number of input rows echoed back in an upload preview.
pub const PREVIEW_ROWS: usize = 5;

/// Header of the CSV bundle summary.
pub const CSV_EXPORT_HEADER: [&str; 3] = ["Resource_Type", "ID", "Created_Date"];

/// Environment prefix for code-system URI overrides, e.g. `CODEBRIDGE_SYSTEM_ICD11`.
pub const SYSTEM_OVERRIDE_ENV_PREFIX: &str = "CODEBRIDGE_SYSTEM_";
