//! FHIR-aligned Patient wire model and translation helpers.
//!
//! Responsibilities:
//! - Define a flat domain-level carrier ([`PatientDemographics`]) for row-derived data
//! - Define the Patient wire model
//! - Translate the flat carrier into the nested wire shape
//!
//! Notes:
//! - Demographic fields are passed through, blank values included: a missing phone number is
//!   still emitted as a `phone` contact point with an empty value
//! - Gender is the one field with a fallback (`unknown`)

use crate::constants::IDENTIFIER_TYPE_SYSTEM;
use crate::datatypes::{Address, CodeableConcept, Coding, ContactPoint, HumanName, Identifier};
use codebridge_uuid::ResourceId;
use serde::{Deserialize, Serialize};

/// Gender code used when the input leaves gender blank.
pub const UNKNOWN_GENDER: &str = "unknown";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for patient demographics (flat structure).
///
/// Every member is optional; `None` means the source cell was missing or blank.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientDemographics {
    /// External medical record number; falls back to the generated resource id.
    pub patient_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    /// Date of birth as supplied (ISO 8601 `YYYY-MM-DD` expected, not enforced).
    pub birth_date: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ============================================================================
// Wire type
// ============================================================================

/// Wire representation of a Patient resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: ResourceId,
    pub identifier: Vec<Identifier>,
    pub name: Vec<HumanName>,
    pub gender: String,
    pub birth_date: String,
    pub address: Vec<Address>,
    pub telecom: Vec<ContactPoint>,
}

impl Patient {
    /// Translate flat demographics into the Patient wire shape.
    ///
    /// `default_country` is used when the demographics carry no country.
    pub fn from_demographics(
        id: ResourceId,
        data: &PatientDemographics,
        default_country: &str,
    ) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        let gender = data
            .gender
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| UNKNOWN_GENDER.to_string());

        let record_number = data
            .patient_id
            .clone()
            .unwrap_or_else(|| id.to_string());

        Self {
            id,
            identifier: vec![Identifier {
                use_type: "usual".into(),
                identifier_type: CodeableConcept::single(Coding::new(
                    IDENTIFIER_TYPE_SYSTEM,
                    "MR",
                    "Medical Record Number",
                )),
                value: record_number,
            }],
            name: vec![HumanName {
                use_type: "official".into(),
                family: text(&data.last_name),
                given: vec![text(&data.first_name)],
            }],
            gender,
            birth_date: text(&data.birth_date),
            address: vec![Address {
                use_type: "home".into(),
                line: vec![text(&data.address_line)],
                city: text(&data.city),
                state: text(&data.state),
                postal_code: text(&data.postal_code),
                country: data
                    .country
                    .clone()
                    .unwrap_or_else(|| default_country.to_string()),
            }],
            telecom: vec![
                ContactPoint {
                    system: "phone".into(),
                    value: text(&data.phone),
                    use_type: "home".into(),
                },
                ContactPoint {
                    system: "email".into(),
                    value: text(&data.email),
                    use_type: "home".into(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ResourceId {
        ResourceId::parse("90a8d1ea-3180-41d9-adb0-70a834d4e0f6").expect("valid id")
    }

    #[test]
    fn renders_full_demographics() {
        let data = PatientDemographics {
            patient_id: Some("MRN-001".into()),
            first_name: Some("Sarah".into()),
            last_name: Some("Williams".into()),
            gender: Some("Female".into()),
            birth_date: Some("1992-03-20".into()),
            address_line: Some("1 High St".into()),
            city: Some("Leeds".into()),
            state: Some("West Yorkshire".into()),
            postal_code: Some("LS1 1AA".into()),
            country: Some("GB".into()),
            phone: Some("0113 000".into()),
            email: Some("sarah@example.com".into()),
        };

        let patient = Patient::from_demographics(id(), &data, "US");
        let json = serde_json::to_value(&patient).expect("serialise patient");

        assert_eq!(json["id"], "90a8d1ea-3180-41d9-adb0-70a834d4e0f6");
        assert_eq!(json["identifier"][0]["value"], "MRN-001");
        assert_eq!(json["identifier"][0]["type"]["coding"][0]["code"], "MR");
        assert_eq!(json["name"][0]["use"], "official");
        assert_eq!(json["name"][0]["family"], "Williams");
        assert_eq!(json["name"][0]["given"][0], "Sarah");
        assert_eq!(json["gender"], "female");
        assert_eq!(json["birthDate"], "1992-03-20");
        assert_eq!(json["address"][0]["postalCode"], "LS1 1AA");
        assert_eq!(json["address"][0]["country"], "GB");
        assert_eq!(json["telecom"][1]["value"], "sarah@example.com");
    }

    #[test]
    fn blank_fields_pass_through_as_empty_strings() {
        let patient = Patient::from_demographics(id(), &PatientDemographics::default(), "US");

        assert_eq!(patient.gender, UNKNOWN_GENDER);
        assert_eq!(patient.birth_date, "");
        assert_eq!(patient.name[0].family, "");
        assert_eq!(patient.name[0].given, vec![String::new()]);
        assert_eq!(patient.address[0].line, vec![String::new()]);
        assert_eq!(patient.address[0].country, "US");
        assert_eq!(patient.telecom.len(), 2);
        assert_eq!(patient.telecom[0].system, "phone");
        assert_eq!(patient.telecom[0].value, "");
        assert_eq!(patient.telecom[1].system, "email");
        assert_eq!(patient.telecom[1].value, "");
    }

    #[test]
    fn identifier_falls_back_to_resource_id() {
        let patient = Patient::from_demographics(id(), &PatientDemographics::default(), "US");
        assert_eq!(
            patient.identifier[0].value,
            "90a8d1ea-3180-41d9-adb0-70a834d4e0f6"
        );
    }

    #[test]
    fn whitespace_gender_is_unknown() {
        let data = PatientDemographics {
            gender: Some("   ".into()),
            ..Default::default()
        };
        let patient = Patient::from_demographics(id(), &data, "US");
        assert_eq!(patient.gender, "unknown");
    }
}
