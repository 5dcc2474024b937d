//! Resource synthesis: one clinical row in, one Patient plus optional Observation and Condition
//! out.
//!
//! Responsibilities:
//! - Decide which resources a row produces (column presence plus a non-blank name)
//! - Assemble multi-system condition codings from the row and the terminology mapper
//! - Isolate row failures: a bad row is reported as skipped and the batch continues

use crate::config::SubjectLinking;
use crate::row::{ClinicalRow, ClinicalTable, RowField};
use chrono::{DateTime, SecondsFormat, Utc};
use codebridge_terminology::{CodeMapper, CodeSystem, CodeSystems, MappingResult};
use codebridge_uuid::ResourceId;
use fhir::{
    Coding, Condition, MeasurementData, Observation, Patient, PatientDemographics, Reference,
    Resource,
};

/// Result of processing one input row.
#[derive(Clone, Debug, PartialEq)]
pub enum RowOutcome {
    Synthesized { row: usize, resources: Vec<Resource> },
    Skipped { row: usize, reason: String },
}

impl RowOutcome {
    /// 1-based source row.
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::Synthesized { row, .. } | RowOutcome::Skipped { row, .. } => *row,
        }
    }
}

/// Outcomes of a whole table, in source row order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    outcomes: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    /// Resources from successful rows, row by row.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.outcomes.iter().flat_map(|o| match o {
            RowOutcome::Synthesized { resources, .. } => resources.as_slice(),
            RowOutcome::Skipped { .. } => &[],
        })
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.outcomes
            .into_iter()
            .flat_map(|o| match o {
                RowOutcome::Synthesized { resources, .. } => resources,
                RowOutcome::Skipped { .. } => Vec::new(),
            })
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        self.resources().count()
    }

    /// Skipped rows with their reasons.
    pub fn skipped(&self) -> Vec<(usize, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RowOutcome::Skipped { row, reason } => Some((*row, reason.as_str())),
                RowOutcome::Synthesized { .. } => None,
            })
            .collect()
    }
}

/// Parse a measurement value. Blank, unparseable and non-finite input all become `0`.
pub fn parse_measurement_value(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Assemble condition codings across systems.
///
/// The primary SNOMED CT entry comes first when a primary code or a display is present; its code
/// is `primary_code` or `""`. One entry follows for each secondary system the mapping has a code
/// for, in fixed order. All entries share the display.
pub fn condition_codings(
    systems: &CodeSystems,
    display: Option<&str>,
    primary_code: Option<&str>,
    mapping: Option<&MappingResult>,
) -> Vec<Coding> {
    let display = display.unwrap_or_default();
    let mut codings = Vec::new();

    if primary_code.is_some() || !display.is_empty() {
        codings.push(Coding::new(
            systems.uri(CodeSystem::PRIMARY),
            primary_code.unwrap_or_default(),
            display,
        ));
    }

    if let Some(mapping) = mapping {
        for system in CodeSystem::SECONDARY {
            if let Some(code) = mapping.code(system) {
                codings.push(Coding::new(systems.uri(system), code, display));
            }
        }
    }
    codings
}

/// Timestamp format used for defaulted dates.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Turns clinical rows into resources.
#[derive(Clone, Debug)]
pub struct ResourceSynthesizer {
    mapper: CodeMapper,
    default_country: String,
    subject_linking: SubjectLinking,
}

impl ResourceSynthesizer {
    pub fn new(
        mapper: CodeMapper,
        default_country: impl Into<String>,
        subject_linking: SubjectLinking,
    ) -> Self {
        Self {
            mapper,
            default_country: default_country.into(),
            subject_linking,
        }
    }

    pub fn mapper(&self) -> &CodeMapper {
        &self.mapper
    }

    /// Synthesize every row of `table`.
    ///
    /// Rows the reader rejected and fully blank rows are reported as skipped; the rest of the
    /// batch is unaffected.
    pub fn synthesize_table(&self, table: &ClinicalTable) -> BatchReport {
        let mut outcomes: Vec<RowOutcome> = table
            .rejected()
            .iter()
            .map(|rejected| RowOutcome::Skipped {
                row: rejected.index,
                reason: rejected.reason.clone(),
            })
            .collect();

        for row in table.rows() {
            outcomes.push(self.synthesize_row(table, row, Utc::now()));
        }
        outcomes.sort_by_key(RowOutcome::row);

        for outcome in &outcomes {
            if let RowOutcome::Skipped { row, reason } = outcome {
                tracing::warn!(row, reason = %reason, "skipping row");
            }
        }

        BatchReport { outcomes }
    }

    /// Synthesize one row, using `now` for defaulted dates.
    pub fn synthesize_row(
        &self,
        table: &ClinicalTable,
        row: ClinicalRow<'_>,
        now: DateTime<Utc>,
    ) -> RowOutcome {
        if row.is_blank() {
            return RowOutcome::Skipped {
                row: row.index(),
                reason: "row is empty".into(),
            };
        }

        let now = timestamp(now);
        let patient = self.patient(row);
        let patient_id = patient.id;
        let mut resources: Vec<Resource> = vec![patient.into()];

        if table.has_measurement_columns() {
            if let Some(observation) = self.observation(row, patient_id, &now) {
                resources.push(observation.into());
            }
        }
        if table.has_condition_columns() {
            if let Some(condition) = self.condition(row, patient_id, &now) {
                resources.push(condition.into());
            }
        }

        tracing::debug!(row = row.index(), resources = resources.len(), "row synthesized");
        RowOutcome::Synthesized {
            row: row.index(),
            resources,
        }
    }

    fn subject(&self, patient_id: ResourceId) -> Reference {
        match self.subject_linking {
            SubjectLinking::Linked => Reference::patient(patient_id),
            SubjectLinking::Detached => Reference::patient(ResourceId::new()),
        }
    }

    fn patient(&self, row: ClinicalRow<'_>) -> Patient {
        let data = PatientDemographics {
            patient_id: row.owned(RowField::PatientId),
            first_name: row.owned(RowField::FirstName),
            last_name: row.owned(RowField::LastName),
            gender: row.owned(RowField::Gender),
            birth_date: row.owned(RowField::BirthDate),
            address_line: row.owned(RowField::Address),
            city: row.owned(RowField::City),
            state: row.owned(RowField::State),
            postal_code: row.owned(RowField::PostalCode),
            country: row.owned(RowField::Country),
            phone: row.owned(RowField::Phone),
            email: row.owned(RowField::Email),
        };
        Patient::from_demographics(ResourceId::new(), &data, &self.default_country)
    }

    fn observation(
        &self,
        row: ClinicalRow<'_>,
        patient_id: ResourceId,
        now: &str,
    ) -> Option<Observation> {
        let name = row.text(RowField::ObservationName)?;
        let data = MeasurementData {
            name: name.to_string(),
            loinc_code: row.owned(RowField::LoincCode),
            value: parse_measurement_value(row.text(RowField::Value)),
            unit: row.owned(RowField::Unit),
            unit_code: row.owned(RowField::UnitCode),
            effective: row
                .owned(RowField::ObservationDate)
                .unwrap_or_else(|| now.to_string()),
        };

        Some(Observation::from_measurement(
            ResourceId::new(),
            self.subject(patient_id),
            &data,
            self.mapper.systems().uri(CodeSystem::Loinc),
        ))
    }

    fn condition(
        &self,
        row: ClinicalRow<'_>,
        patient_id: ResourceId,
        now: &str,
    ) -> Option<Condition> {
        let name = row.text(RowField::ConditionName)?;
        let mapping = self.mapper.resolve_by_name(name);
        let codings = condition_codings(
            self.mapper.systems(),
            Some(name),
            row.text(RowField::SnomedCode),
            mapping.as_ref(),
        );

        Some(Condition::encounter_diagnosis(
            ResourceId::new(),
            self.subject(patient_id),
            codings,
            name,
            row.owned(RowField::OnsetDate)
                .unwrap_or_else(|| now.to_string()),
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codebridge_ingest::Table;
    use codebridge_terminology::TerminologyTable;
    use std::sync::Arc;

    fn diabetes_mapper() -> CodeMapper {
        let mut table = Table::new(["disease", "snomed", "icd11"]);
        table.push_cells([Some("Diabetes"), Some("E11"), Some("AY01")]);
        let table = TerminologyTable::from_table(table, "inline");
        CodeMapper::new(Some(Arc::new(table)), CodeSystems::new())
    }

    fn synthesizer(linking: SubjectLinking) -> ResourceSynthesizer {
        ResourceSynthesizer::new(diabetes_mapper(), "US", linking)
    }

    fn clinical(headers: &[&str], rows: &[&[Option<&str>]]) -> ClinicalTable {
        let mut table = Table::new(headers);
        for row in rows {
            table.push_cells(row.iter().copied());
        }
        ClinicalTable::new(table)
    }

    fn single(report: &BatchReport) -> &[Resource] {
        match &report.outcomes()[0] {
            RowOutcome::Synthesized { resources, .. } => resources,
            other => panic!("expected Synthesized, got {other:?}"),
        }
    }

    #[test]
    fn condition_codings_follow_mapping() {
        let table = clinical(&["condition_name"], &[&[Some("Diabetes")]]);
        let report = synthesizer(SubjectLinking::Detached).synthesize_table(&table);
        let resources = single(&report);
        assert_eq!(resources.len(), 2);

        let Resource::Condition(condition) = &resources[1] else {
            panic!("expected Condition, got {:?}", resources[1]);
        };
        assert_eq!(
            condition.code.coding,
            vec![
                Coding::new("http://snomed.info/sct", "", "Diabetes"),
                Coding::new("http://id.who.int/icd/release/11/mms", "AY01", "Diabetes"),
            ]
        );
        assert_eq!(condition.code.text.as_deref(), Some("Diabetes"));
    }

    #[test]
    fn row_snomed_code_is_primary() {
        let table = clinical(
            &["condition_name", "snomed_code", "onset_date"],
            &[&[Some("Asthma"), Some("195967001"), Some("2024-05-01")]],
        );
        let report = synthesizer(SubjectLinking::Detached).synthesize_table(&table);
        let Resource::Condition(condition) = &single(&report)[1] else {
            panic!("expected Condition");
        };
        assert_eq!(condition.code.coding.len(), 1);
        assert_eq!(condition.code.coding[0].code, "195967001");
        assert_eq!(condition.onset_date_time, "2024-05-01");
    }

    #[test]
    fn blank_observation_name_means_no_observation() {
        let table = clinical(
            &["first_name", "observation_name", "value", "unit"],
            &[&[Some("Asha"), None, Some("98.6"), Some("F")]],
        );
        let report = synthesizer(SubjectLinking::Detached).synthesize_table(&table);
        let resources = single(&report);
        assert_eq!(resources.len(), 1);
        assert!(matches!(resources[0], Resource::Patient(_)));
    }

    #[test]
    fn non_numeric_value_becomes_zero() {
        let table = clinical(
            &["observation_name", "value", "unit", "observation_date"],
            &[&[Some("Heart rate"), Some("fast"), Some("bpm"), Some("2024-01-01")]],
        );
        let report = synthesizer(SubjectLinking::Detached).synthesize_table(&table);
        let Resource::Observation(observation) = &single(&report)[1] else {
            panic!("expected Observation");
        };
        assert_eq!(observation.value_quantity.value, 0.0);
        assert_eq!(observation.value_quantity.unit, "bpm");
        assert_eq!(observation.effective_date_time, "2024-01-01");
        assert_eq!(observation.code.coding[0].system, "http://loinc.org");
    }

    #[test]
    fn value_parsing_edge_cases() {
        assert_eq!(parse_measurement_value(Some(" 7.25 ")), 7.25);
        assert_eq!(parse_measurement_value(Some("NaN")), 0.0);
        assert_eq!(parse_measurement_value(Some("inf")), 0.0);
        assert_eq!(parse_measurement_value(None), 0.0);
    }

    #[test]
    fn no_condition_without_condition_columns() {
        let table = clinical(&["first_name"], &[&[Some("Ravi")]]);
        let report = synthesizer(SubjectLinking::Detached).synthesize_table(&table);
        assert_eq!(report.resource_count(), 1);
    }

    #[test]
    fn linked_subjects_point_at_patient() {
        let table = clinical(
            &["condition_name", "observation_name"],
            &[&[Some("Diabetes"), Some("Glucose")]],
        );
        let report = synthesizer(SubjectLinking::Linked).synthesize_table(&table);
        let resources = single(&report);
        let patient_ref = format!("Patient/{}", resources[0].id());

        let Resource::Observation(observation) = &resources[1] else {
            panic!("expected Observation");
        };
        let Resource::Condition(condition) = &resources[2] else {
            panic!("expected Condition");
        };
        assert_eq!(observation.subject.reference, patient_ref);
        assert_eq!(condition.subject.reference, patient_ref);
    }

    #[test]
    fn detached_subjects_get_fresh_ids() {
        let table = clinical(&["condition_name"], &[&[Some("Diabetes")]]);
        let report = synthesizer(SubjectLinking::Detached).synthesize_table(&table);
        let resources = single(&report);
        let Resource::Condition(condition) = &resources[1] else {
            panic!("expected Condition");
        };
        assert_ne!(
            condition.subject.reference,
            format!("Patient/{}", resources[0].id())
        );
    }

    #[test]
    fn blank_and_rejected_rows_are_skipped_in_order() {
        let mut table = Table::new(["first_name"]);
        table.push_cells([Some("Asha")]);
        table.push_rejected("unequal lengths");
        table.push_cells([None::<&str>]);
        table.push_cells([Some("Ravi")]);
        let report = synthesizer(SubjectLinking::Detached)
            .synthesize_table(&ClinicalTable::new(table));

        let rows: Vec<usize> = report.outcomes().iter().map(RowOutcome::row).collect();
        assert_eq!(rows, vec![1, 2, 3, 4]);
        assert_eq!(report.resource_count(), 2);
        assert_eq!(
            report.skipped(),
            vec![(2, "unequal lengths"), (3, "row is empty")]
        );
    }

    #[test]
    fn codings_without_display_or_primary_code() {
        let mapping = MappingResult {
            icd11_code: Some("CA23".into()),
            unani_code: Some("UN-1".into()),
            ..MappingResult::default()
        };
        let codings = condition_codings(&CodeSystems::new(), None, None, Some(&mapping));
        assert_eq!(codings.len(), 2);
        assert_eq!(codings[0].code, "CA23");
        assert_eq!(
            codings[1].system,
            "https://nrces.in/terminology/CodeSystem/ayush-unani"
        );
    }
}
