//! FHIR complex datatypes shared by the emitted resources.
//!
//! String members are plain `String`s rather than `Option<String>`: the engine passes blank
//! input through as `""` for demographic fields, and the wire shape must reflect that exactly.

use serde::{Deserialize, Serialize};

/// A code from a code system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    pub display: String,
}

impl Coding {
    pub fn new(
        system: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            display: display.into(),
        }
    }
}

/// A concept expressed as a set of codings plus optional free text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// A concept holding exactly one coding and no text.
    pub fn single(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    /// A concept holding the given codings and text.
    pub fn with_text(coding: Vec<Coding>, text: impl Into<String>) -> Self {
        Self {
            coding,
            text: Some(text.into()),
        }
    }
}

/// A reference to another resource, e.g. `Patient/<id>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

impl Reference {
    /// Reference to a Patient resource with the given id.
    pub fn patient(id: impl std::fmt::Display) -> Self {
        Self {
            reference: format!("Patient/{id}"),
        }
    }
}

/// A business identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "use")]
    pub use_type: String,

    #[serde(rename = "type")]
    pub identifier_type: CodeableConcept,

    pub value: String,
}

/// A human name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(rename = "use")]
    pub use_type: String,
    pub family: String,
    pub given: Vec<String>,
}

/// A postal address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use")]
    pub use_type: String,
    pub line: Vec<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// A contact channel such as a phone number or e-mail address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPoint {
    pub system: String,
    pub value: String,
    #[serde(rename = "use")]
    pub use_type: String,
}

/// A measured amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
    pub system: String,
    pub code: String,
}
