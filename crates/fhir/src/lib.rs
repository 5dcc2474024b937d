//! FHIR wire support for CodeBridge.
//!
//! This crate provides **wire models** for the handful of FHIR R4 resources the conversion
//! engine emits, plus the collection bundle that carries them to disk:
//! - `Patient`, `Observation`, `Condition`
//! - `Bundle` of type `collection`
//!
//! Only the fields the engine actually produces are modelled; this is not a general FHIR
//! schema. Resources serialise to FHIR-shaped JSON (`resourceType` tag, camelCase members).

pub mod bundle;
pub mod condition;
pub mod constants;
pub mod datatypes;
pub mod observation;
pub mod patient;
pub mod resource;

pub use bundle::{Bundle, BundleEntry};
pub use condition::Condition;
pub use datatypes::{
    Address, CodeableConcept, Coding, ContactPoint, HumanName, Identifier, Quantity, Reference,
};
pub use observation::{MeasurementData, Observation};
pub use patient::{Patient, PatientDemographics, UNKNOWN_GENDER};
pub use resource::{Resource, ResourceKind};

pub use codebridge_uuid::ResourceId;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
