use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create directory {path}: {source}", path = path.display())]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bundle already exists: {}", .0.display())]
    BundleExists(PathBuf),
    #[error("failed to serialize resource: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
    #[error("input table error: {0}")]
    Ingest(#[from] codebridge_ingest::IngestError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] codebridge_uuid::UuidError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
