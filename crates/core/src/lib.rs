//! # CodeBridge Core
//!
//! Core business logic for converting clinical tables into FHIR bundles.
//!
//! This crate contains the conversion engine and its file output:
//! - Typed access to clinical input rows ([`ClinicalTable`], [`RowField`])
//! - Resource synthesis with multi-system condition coding ([`ResourceSynthesizer`])
//! - Bundle assembly, write-once storage, retrieval and CSV export ([`BundleStore`])
//! - The [`ConversionService`] tying these together for the binaries
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and
//! `codebridge-cli`.

pub mod bundle;
pub mod config;
pub mod constants;
pub mod error;
pub mod row;
pub mod service;
pub mod synthesis;

pub use bundle::{export_csv, save_individual, BundleAssembler, BundleStore};
pub use config::{CoreConfig, SubjectLinking};
pub use error::{CoreError, CoreResult};
pub use row::{ClinicalRow, ClinicalTable, RowField};
pub use service::{
    CodeMapping, ConversionOutcome, ConversionService, MappedCondition, PatientForm, PreviewRow,
    SkippedRow,
};
pub use synthesis::{BatchReport, ResourceSynthesizer, RowOutcome};

pub use codebridge_ingest::MAX_TABLE_FILE_SIZE;
pub use codebridge_terminology::{CodeSystem, CodeSystems, MappingQuery, MappingResult};
pub use fhir::Bundle;
