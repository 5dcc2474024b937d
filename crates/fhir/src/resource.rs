//! The closed set of resources the engine emits.

use crate::{Condition, Observation, Patient};
use codebridge_uuid::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kind, as written in the `resourceType` member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Patient,
    Observation,
    Condition,
}

impl ResourceKind {
    /// The FHIR `resourceType` string.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Observation => "Observation",
            ResourceKind::Condition => "Condition",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted resource, tagged by `resourceType` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(Patient),
    Observation(Observation),
    Condition(Condition),
}

impl Resource {
    pub fn id(&self) -> ResourceId {
        match self {
            Resource::Patient(r) => r.id,
            Resource::Observation(r) => r.id,
            Resource::Condition(r) => r.id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Patient(_) => ResourceKind::Patient,
            Resource::Observation(_) => ResourceKind::Observation,
            Resource::Condition(_) => ResourceKind::Condition,
        }
    }
}

impl From<Patient> for Resource {
    fn from(value: Patient) -> Self {
        Resource::Patient(value)
    }
}

impl From<Observation> for Resource {
    fn from(value: Observation) -> Self {
        Resource::Observation(value)
    }
}

impl From<Condition> for Resource {
    fn from(value: Condition) -> Self {
        Resource::Condition(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::PatientDemographics;

    #[test]
    fn serialises_with_resource_type_tag() {
        let patient = Patient::from_demographics(ResourceId::new(), &PatientDemographics::default(), "US");
        let id = patient.id;
        let resource = Resource::from(patient);

        let json = serde_json::to_value(&resource).expect("serialise resource");
        assert_eq!(json["resourceType"], "Patient");
        assert_eq!(json["id"], id.to_string());

        let back: Resource = serde_json::from_value(json).expect("deserialise resource");
        assert_eq!(back.kind(), ResourceKind::Patient);
        assert_eq!(back.id(), id);
    }

    #[test]
    fn unknown_resource_type_is_rejected() {
        let json = serde_json::json!({ "resourceType": "Encounter", "id": "x" });
        assert!(serde_json::from_value::<Resource>(json).is_err());
    }
}
