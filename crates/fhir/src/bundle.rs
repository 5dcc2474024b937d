//! FHIR-aligned collection Bundle wire model and (de)serialisation helpers.
//!
//! A bundle is written once, immediately after a conversion run, and read back by id for
//! retrieval and export. The JSON is pretty printed and keeps non-ASCII text as-is.

use crate::constants::BUNDLE_TYPE_COLLECTION;
use crate::resource::{Resource, ResourceKind};
use crate::FhirError;
use chrono::{DateTime, Utc};
use codebridge_uuid::ResourceId;
use serde::{Deserialize, Serialize};

const BUNDLE_RESOURCE_TYPE: &str = "Bundle";

/// Wire representation of a collection bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    pub id: ResourceId,

    #[serde(rename = "type")]
    pub bundle_type: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

/// One bundle entry wrapping a resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleEntry {
    pub resource: Resource,
}

impl Bundle {
    /// Create a collection bundle holding `resources` in the given order.
    pub fn collection(
        id: ResourceId,
        timestamp: DateTime<Utc>,
        resources: impl IntoIterator<Item = Resource>,
    ) -> Self {
        Self {
            resource_type: BUNDLE_RESOURCE_TYPE.into(),
            id,
            bundle_type: BUNDLE_TYPE_COLLECTION.into(),
            timestamp,
            entry: resources
                .into_iter()
                .map(|resource| BundleEntry { resource })
                .collect(),
        }
    }

    /// Parse a bundle from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `entry[2].resource.id`) of the
    /// failing member when the JSON does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] on schema mismatch and [`FhirError::InvalidInput`] if
    /// `resourceType` is not `"Bundle"`.
    pub fn parse(json_text: &str) -> Result<Bundle, FhirError> {
        let deserializer = &mut serde_json::Deserializer::from_str(json_text);

        let bundle = match serde_path_to_error::deserialize::<_, Bundle>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };

        if bundle.resource_type != BUNDLE_RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                bundle.resource_type
            )));
        }

        Ok(bundle)
    }

    /// Render the bundle as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if serialisation fails.
    pub fn render(&self) -> Result<String, FhirError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Resources in entry order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().map(|e| &e.resource)
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    /// Count of resources per kind, in first-seen order.
    pub fn summary(&self) -> Vec<(ResourceKind, usize)> {
        let mut counts: Vec<(ResourceKind, usize)> = Vec::new();
        for resource in self.resources() {
            let kind = resource.kind();
            match counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Coding, Reference};
    use crate::patient::PatientDemographics;
    use crate::{Condition, Patient};

    fn sample_bundle() -> Bundle {
        let patient =
            Patient::from_demographics(ResourceId::new(), &PatientDemographics::default(), "US");
        let condition = Condition::encounter_diagnosis(
            ResourceId::new(),
            Reference::patient(ResourceId::new()),
            vec![Coding::new("http://snomed.info/sct", "", "Asthma")],
            "Asthma",
            "2024-01-01",
            "2024-01-01",
        );
        Bundle::collection(
            ResourceId::new(),
            Utc::now(),
            vec![patient.into(), condition.into()],
        )
    }

    #[test]
    fn collection_bundle_shape() {
        let bundle = sample_bundle();
        let json = serde_json::to_value(&bundle).expect("serialise bundle");

        assert_eq!(json["resourceType"], "Bundle");
        assert_eq!(json["type"], "collection");
        assert_eq!(json["entry"][0]["resource"]["resourceType"], "Patient");
        assert_eq!(json["entry"][1]["resource"]["resourceType"], "Condition");
    }

    #[test]
    fn render_then_parse_preserves_everything() {
        let bundle = sample_bundle();
        let text = bundle.render().expect("render");
        let parsed = Bundle::parse(&text).expect("parse");

        assert_eq!(parsed.id, bundle.id);
        assert_eq!(parsed.timestamp, bundle.timestamp);
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn rejects_wrong_resource_type() {
        let mut json = serde_json::to_value(sample_bundle()).expect("serialise");
        json["resourceType"] = "Patient".into();

        match Bundle::parse(&json.to_string()) {
            Err(FhirError::InvalidInput(msg)) => assert!(msg.contains("Bundle")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn schema_mismatch_reports_path() {
        let mut json = serde_json::to_value(sample_bundle()).expect("serialise");
        json["entry"][1]["resource"]["id"] = "not-a-uuid".into();

        match Bundle::parse(&json.to_string()) {
            Err(FhirError::Translation(msg)) => assert!(msg.contains("entry")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn summary_counts_in_first_seen_order() {
        let bundle = sample_bundle();
        assert_eq!(
            bundle.summary(),
            vec![(ResourceKind::Patient, 1), (ResourceKind::Condition, 1)]
        );
    }
}
