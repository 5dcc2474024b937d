//! Fixed FHIR system URIs and codes used by the emitted resources.

/// HL7 identifier type code system (v2 table 0203).
pub const IDENTIFIER_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";

/// HL7 observation category code system.
pub const OBSERVATION_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";

/// HL7 condition clinical status code system.
pub const CONDITION_CLINICAL_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-clinical";

/// HL7 condition verification status code system.
pub const CONDITION_VER_STATUS_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-ver-status";

/// HL7 condition category code system.
pub const CONDITION_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-category";

/// Unified Code for Units of Measure.
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// Bundle type emitted by the engine.
pub const BUNDLE_TYPE_COLLECTION: &str = "collection";
