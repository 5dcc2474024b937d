//! FHIR-aligned Observation wire model.
//!
//! The engine emits a single vital-signs style measurement per input row: one LOINC coding,
//! one quantity, a subject reference and an effective time.

use crate::constants::{OBSERVATION_CATEGORY_SYSTEM, UCUM_SYSTEM};
use crate::datatypes::{CodeableConcept, Coding, Quantity, Reference};
use codebridge_uuid::ResourceId;
use serde::{Deserialize, Serialize};

/// Domain-level carrier for one measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementData {
    /// Display name of what was measured; never blank.
    pub name: String,
    pub loinc_code: Option<String>,
    /// Already-parsed numeric value.
    pub value: f64,
    pub unit: Option<String>,
    pub unit_code: Option<String>,
    /// When the measurement was taken, as supplied or defaulted by the caller.
    pub effective: String,
}

/// Wire representation of an Observation resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: ResourceId,
    pub status: String,
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub effective_date_time: String,
    pub value_quantity: Quantity,
}

impl Observation {
    /// Build a final vital-signs Observation from a measurement.
    ///
    /// `loinc_system` is the system URI for the measurement coding.
    pub fn from_measurement(
        id: ResourceId,
        subject: Reference,
        data: &MeasurementData,
        loinc_system: &str,
    ) -> Self {
        let coding = Coding::new(
            loinc_system,
            data.loinc_code.clone().unwrap_or_default(),
            data.name.clone(),
        );

        Self {
            id,
            status: "final".into(),
            category: vec![CodeableConcept::single(Coding::new(
                OBSERVATION_CATEGORY_SYSTEM,
                "vital-signs",
                "Vital Signs",
            ))],
            code: CodeableConcept::with_text(vec![coding], data.name.clone()),
            subject,
            effective_date_time: data.effective.clone(),
            value_quantity: Quantity {
                value: data.value,
                unit: data.unit.clone().unwrap_or_default(),
                system: UCUM_SYSTEM.into(),
                code: data.unit_code.clone().unwrap_or_default(),
            },
        }
    }
}
