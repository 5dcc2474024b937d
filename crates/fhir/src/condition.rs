//! FHIR-aligned Condition wire model.
//!
//! Conditions are always emitted as active, confirmed encounter diagnoses. The interesting part
//! is `code.coding`, which the caller assembles across several coding systems.

use crate::constants::{
    CONDITION_CATEGORY_SYSTEM, CONDITION_CLINICAL_SYSTEM, CONDITION_VER_STATUS_SYSTEM,
};
use crate::datatypes::{CodeableConcept, Coding, Reference};
use codebridge_uuid::ResourceId;
use serde::{Deserialize, Serialize};

/// Wire representation of a Condition resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: ResourceId,
    pub clinical_status: CodeableConcept,
    pub verification_status: CodeableConcept,
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub onset_date_time: String,
    pub recorded_date: String,
}

impl Condition {
    /// Build an active, confirmed encounter-diagnosis Condition.
    ///
    /// `codings` are emitted in the order given; `text` becomes `code.text`.
    pub fn encounter_diagnosis(
        id: ResourceId,
        subject: Reference,
        codings: Vec<Coding>,
        text: impl Into<String>,
        onset: impl Into<String>,
        recorded: impl Into<String>,
    ) -> Self {
        Self {
            id,
            clinical_status: CodeableConcept::single(Coding::new(
                CONDITION_CLINICAL_SYSTEM,
                "active",
                "Active",
            )),
            verification_status: CodeableConcept::single(Coding::new(
                CONDITION_VER_STATUS_SYSTEM,
                "confirmed",
                "Confirmed",
            )),
            category: vec![CodeableConcept::single(Coding::new(
                CONDITION_CATEGORY_SYSTEM,
                "encounter-diagnosis",
                "Encounter Diagnosis",
            ))],
            code: CodeableConcept::with_text(codings, text),
            subject,
            onset_date_time: onset.into(),
            recorded_date: recorded.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_fixed_status_members() {
        let condition = Condition::encounter_diagnosis(
            ResourceId::new(),
            Reference::patient("p1"),
            vec![Coding::new("http://snomed.info/sct", "", "Diabetes")],
            "Diabetes",
            "2024-05-01",
            "2024-05-02T10:00:00+00:00",
        );
        let json = serde_json::to_value(&condition).expect("serialise condition");

        assert_eq!(json["clinicalStatus"]["coding"][0]["code"], "active");
        assert_eq!(json["verificationStatus"]["coding"][0]["code"], "confirmed");
        assert_eq!(json["category"][0]["coding"][0]["code"], "encounter-diagnosis");
        assert_eq!(json["code"]["text"], "Diabetes");
        assert_eq!(json["code"]["coding"][0]["code"], "");
        assert_eq!(json["onsetDateTime"], "2024-05-01");
        assert_eq!(json["recordedDate"], "2024-05-02T10:00:00+00:00");
    }
}
