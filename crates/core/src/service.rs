//! Conversion service: the operations the REST API and the CLI expose.
//!
//! The service owns a [`ResourceSynthesizer`] (and through it the shared terminology table) plus
//! a [`BundleStore`]. It is cheap to clone and holds no per-request state.

use crate::bundle::{self, BundleAssembler, BundleStore};
use crate::config::CoreConfig;
use crate::constants::{PREVIEW_ROWS, UPLOAD_EXTENSIONS};
use crate::row::ClinicalTable;
use crate::synthesis::{condition_codings, BatchReport, ResourceSynthesizer};
use crate::{CoreError, CoreResult};
use codebridge_ingest::{read_table, Table};
use codebridge_terminology::{CodeMapper, MappingQuery, MappingResult, TerminologyTable};
use codebridge_uuid::ResourceId;
use fhir::{Bundle, CodeableConcept};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A row that produced no resources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

/// One input row keyed by normalised column name; blank cells are `None`.
pub type PreviewRow = BTreeMap<String, Option<String>>;

/// Result of one conversion run.
#[derive(Clone, Debug)]
pub struct ConversionOutcome {
    pub bundle: Bundle,
    pub path: PathBuf,
    pub skipped: Vec<SkippedRow>,
    /// The first few input rows as read.
    pub preview: Vec<PreviewRow>,
}

impl ConversionOutcome {
    pub fn resource_count(&self) -> usize {
        self.bundle.len()
    }
}

/// Manually entered patient data. Every member is free text; blank means absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub condition: Option<String>,
    pub snomed_code: Option<String>,
    pub observation: Option<String>,
    pub value: Option<String>,
    pub unit: Option<String>,
}

impl PatientForm {
    /// The form as one named input row. Every column is present, so blank condition and
    /// observation fields follow the same rules as a spreadsheet row.
    fn to_table(&self) -> Table {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let record = vec![
            ("first_name", text(&self.first_name)),
            ("last_name", text(&self.last_name)),
            ("gender", text(&self.gender)),
            ("birth_date", text(&self.birth_date)),
            ("phone", text(&self.phone)),
            ("email", text(&self.email)),
            ("address", text(&self.address)),
            ("city", text(&self.city)),
            ("state", text(&self.state)),
            ("postal_code", text(&self.postal_code)),
            ("country", text(&self.country)),
            ("condition_name", text(&self.condition)),
            ("snomed_code", text(&self.snomed_code)),
            ("observation_name", text(&self.observation)),
            ("value", text(&self.value)),
            ("unit", text(&self.unit)),
        ];
        Table::from_named_rows([record])
    }
}

/// Response to a code mapping query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CodeMapping {
    pub mappings: MappingResult,
    pub systems: BTreeMap<&'static str, String>,
    pub condition: MappedCondition,
}

/// Minimal Condition carrying only the mapped codings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MappedCondition {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str,
    pub code: CodeableConcept,
}

/// Converts tabular input into stored bundles and answers code lookups.
#[derive(Clone, Debug)]
pub struct ConversionService {
    cfg: Arc<CoreConfig>,
    synthesizer: ResourceSynthesizer,
    store: BundleStore,
}

impl ConversionService {
    /// Build the service around an already-loaded terminology table.
    pub fn new(cfg: Arc<CoreConfig>, table: Option<Arc<TerminologyTable>>) -> Self {
        let mapper = CodeMapper::new(table, cfg.code_systems().clone());
        let synthesizer =
            ResourceSynthesizer::new(mapper, cfg.default_country(), cfg.subject_linking());
        let store = BundleStore::new(cfg.bundle_data_dir());
        Self {
            cfg,
            synthesizer,
            store,
        }
    }

    /// Build the service, loading the terminology table from the configured candidates.
    pub fn load(cfg: Arc<CoreConfig>) -> Self {
        let table = TerminologyTable::load(cfg.terminology_candidates()).map(Arc::new);
        Self::new(cfg, table)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    pub fn mapper(&self) -> &CodeMapper {
        self.synthesizer.mapper()
    }

    /// Convert the table stored at `path` and write the bundle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Ingest`] if the file cannot be read as a table,
    /// [`CoreError::InvalidInput`] if no row produced resources, and I/O errors from the store.
    pub fn convert_file(&self, path: &Path) -> CoreResult<ConversionOutcome> {
        let table = read_table(path)?;
        tracing::info!(path = %path.display(), rows = table.len(), "converting table");
        self.convert_table(table)
    }

    /// Convert an in-memory table and write the bundle.
    pub fn convert_table(&self, table: Table) -> CoreResult<ConversionOutcome> {
        let preview = preview_rows(&table, PREVIEW_ROWS);
        let report = self.synthesizer.synthesize_table(&ClinicalTable::new(table));
        self.store_report(report, preview)
    }

    /// Convert one manually entered patient and write the bundle.
    pub fn submit_patient(&self, form: &PatientForm) -> CoreResult<ConversionOutcome> {
        self.convert_table(form.to_table())
    }

    fn store_report(
        &self,
        report: BatchReport,
        preview: Vec<PreviewRow>,
    ) -> CoreResult<ConversionOutcome> {
        let skipped = report
            .skipped()
            .into_iter()
            .map(|(row, reason)| SkippedRow {
                row,
                reason: reason.to_string(),
            })
            .collect::<Vec<_>>();

        let resources = report.into_resources();
        if resources.is_empty() {
            return Err(CoreError::InvalidInput(
                "no resources could be produced from the input".into(),
            ));
        }

        let bundle = BundleAssembler::assemble(resources);
        let path = self.store.save(&bundle)?;
        Ok(ConversionOutcome {
            bundle,
            path,
            skipped,
            preview,
        })
    }

    /// Resolve a mapping query.
    ///
    /// Returns `None` when no usable key was given or nothing matched.
    pub fn map_codes(&self, query: &MappingQuery) -> Option<CodeMapping> {
        let mapper = self.mapper();
        let mappings = mapper.resolve_by_any(query)?;

        let display = query
            .disease_name()
            .or(mappings.disease.as_deref())
            .unwrap_or_default()
            .to_string();
        let coding = condition_codings(
            mapper.systems(),
            Some(display.as_str()),
            mappings.snomed_code.as_deref(),
            Some(&mappings),
        );

        Some(CodeMapping {
            systems: mapper.systems().as_map(),
            condition: MappedCondition {
                resource_type: "Condition",
                code: CodeableConcept::with_text(coding, display),
            },
            mappings,
        })
    }

    /// Stored bundle for `id`, or `None`.
    pub fn bundle(&self, id: &str) -> CoreResult<Option<Bundle>> {
        self.store.load(id)
    }

    /// CSV summary of the stored bundle for `id`, or `None`.
    pub fn export_csv(&self, id: &str) -> CoreResult<Option<String>> {
        self.store.export_csv(id)
    }

    /// Write the bundle's resources as individual files under `dir`.
    pub fn save_individual(&self, bundle: &Bundle, dir: &Path) -> CoreResult<Vec<PathBuf>> {
        bundle::save_individual(bundle.resources(), dir)
    }

    /// Persist an uploaded file under the upload directory and return its path.
    ///
    /// The stored name is the sanitised original name prefixed with a fresh id, so uploads never
    /// overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] unless the extension is one of
    /// [`UPLOAD_EXTENSIONS`].
    pub fn store_upload(&self, file_name: &str, contents: &[u8]) -> CoreResult<PathBuf> {
        let name = sanitize_file_name(file_name);
        let extension = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
            return Err(CoreError::InvalidInput(format!(
                "unsupported file type '{extension}', expected one of: {}",
                UPLOAD_EXTENSIONS.join(", ")
            )));
        }

        let dir = self.cfg.upload_dir();
        fs::create_dir_all(dir).map_err(|source| CoreError::DirCreation {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(format!("{}_{name}", ResourceId::new()));
        fs::write(&path, contents).map_err(|source| CoreError::FileWrite {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "upload stored");
        Ok(path)
    }
}

fn preview_rows(table: &Table, n: usize) -> Vec<PreviewRow> {
    table
        .rows()
        .iter()
        .take(n)
        .map(|row| {
            table
                .headers()
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.cell(i).map(str::to_string)))
                .collect()
        })
        .collect()
}

/// Reduce an uploaded file name to a safe single path component.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".into()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubjectLinking;
    use codebridge_terminology::{CodeSystem, CodeSystems};
    use fhir::Resource;
    use tempfile::TempDir;

    fn service(tmp: &TempDir, mapping_csv: Option<&str>) -> ConversionService {
        let mut candidates = Vec::new();
        if let Some(csv) = mapping_csv {
            let path = tmp.path().join("code_mappings.csv");
            fs::write(&path, csv).expect("write mapping");
            candidates.push(path);
        }
        let cfg = CoreConfig::new(
            tmp.path().join("bundles"),
            tmp.path().join("uploads"),
            candidates,
            CodeSystems::new(),
            "US".into(),
            SubjectLinking::Detached,
        )
        .expect("valid config");
        ConversionService::load(Arc::new(cfg))
    }

    const MAPPING: &str = "Disease,SNOMED,ICD 11,Ayurveda,Siddha,Unani\n\
        Diabetes,73211009,5A11,AY-9,,UN-4\n\
        Influenza,6142004,1E32,,,\n";

    #[test]
    fn converts_file_and_reloads_bundle() {
        let tmp = TempDir::new().expect("tempdir");
        let svc = service(&tmp, Some(MAPPING));
        let input = tmp.path().join("patients.csv");
        fs::write(
            &input,
            "first_name,last_name,condition_name,observation_name,value,unit\n\
             Asha,Rao,Diabetes,Glucose,7.1,mmol/L\n\
             ,,,,,\n\
             Ravi,Kumar,,,,\n",
        )
        .expect("write input");

        let outcome = svc.convert_file(&input).expect("convert");
        assert_eq!(outcome.resource_count(), 4);
        assert_eq!(outcome.preview.len(), 3);
        assert_eq!(outcome.preview[0]["first_name"].as_deref(), Some("Asha"));
        assert_eq!(outcome.preview[0]["value"].as_deref(), Some("7.1"));
        assert_eq!(outcome.preview[1]["first_name"], None);
        assert_eq!(
            outcome.skipped,
            vec![SkippedRow {
                row: 2,
                reason: "row is empty".into()
            }]
        );

        let loaded = svc
            .bundle(&outcome.bundle.id.to_string())
            .expect("load")
            .expect("bundle exists");
        assert_eq!(loaded, outcome.bundle);

        let Resource::Condition(condition) = &loaded.entry[2].resource else {
            panic!("expected Condition, got {:?}", loaded.entry[2].resource);
        };
        let codes: Vec<&str> = condition.code.coding.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["", "5A11", "AY-9", "UN-4"]);
    }

    #[test]
    fn manual_patient_without_condition() {
        let tmp = TempDir::new().expect("tempdir");
        let svc = service(&tmp, None);
        let form = PatientForm {
            first_name: Some("Meera".into()),
            gender: Some("FEMALE".into()),
            observation: Some("  ".into()),
            value: Some("98".into()),
            ..PatientForm::default()
        };

        let outcome = svc.submit_patient(&form).expect("submit");
        assert_eq!(outcome.resource_count(), 1);
        let Resource::Patient(patient) = &outcome.bundle.entry[0].resource else {
            panic!("expected Patient");
        };
        assert_eq!(patient.gender, "female");
        assert_eq!(patient.address[0].country, "US");
    }

    #[test]
    fn map_codes_builds_condition() {
        let tmp = TempDir::new().expect("tempdir");
        let svc = service(&tmp, Some(MAPPING));

        let query = MappingQuery::new().code(CodeSystem::Icd11, Some("1e32"));
        let mapping = svc.map_codes(&query).expect("mapping found");
        assert_eq!(mapping.mappings.disease.as_deref(), Some("Influenza"));
        assert_eq!(mapping.systems.len(), 6);
        assert_eq!(mapping.condition.code.text.as_deref(), Some("Influenza"));
        assert_eq!(mapping.condition.code.coding.len(), 2);
        assert_eq!(mapping.condition.code.coding[0].code, "6142004");

        let supplied = MappingQuery::new().disease(Some("diabetes"));
        let mapping = svc.map_codes(&supplied).expect("mapping found");
        assert_eq!(mapping.condition.code.text.as_deref(), Some("diabetes"));
        assert!(mapping
            .condition
            .code
            .coding
            .iter()
            .all(|c| c.display == "diabetes"));

        assert!(svc.map_codes(&MappingQuery::new()).is_none());
        assert!(svc
            .map_codes(&MappingQuery::new().disease(Some("measles")))
            .is_none());
    }

    #[test]
    fn empty_input_is_rejected() {
        let tmp = TempDir::new().expect("tempdir");
        let svc = service(&tmp, None);
        let input = tmp.path().join("empty.csv");
        fs::write(&input, "first_name\n").expect("write input");

        match svc.convert_file(&input) {
            Err(CoreError::InvalidInput(msg)) => assert!(msg.contains("no resources")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn uploads_are_sanitised_and_typed() {
        let tmp = TempDir::new().expect("tempdir");
        let svc = service(&tmp, None);

        let path = svc
            .store_upload("../../my data.csv", b"first_name\nA\n")
            .expect("store upload");
        assert!(path.starts_with(tmp.path().join("uploads")));
        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(name.ends_with("_my_data.csv"));

        match svc.store_upload("notes.txt", b"hello") {
            Err(CoreError::InvalidInput(msg)) => assert!(msg.contains("'txt'")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        for name in ["sheet.ods", "macro.xlsm", "rows.tab"] {
            match svc.store_upload(name, b"a\n1\n") {
                Err(CoreError::InvalidInput(_)) => {}
                other => panic!("expected InvalidInput for {name}, got {other:?}"),
            }
        }
        svc.store_upload("Rows.TSV", b"a\n1\n")
            .expect("upper-case extension accepted");
    }

    #[test]
    fn preview_keeps_the_first_rows_only() {
        let mut table = Table::new(["First Name", "Notes"]);
        for i in 1..=7 {
            table.push_cells([Some(format!("p{i}")), None]);
        }

        let preview = preview_rows(&table, PREVIEW_ROWS);
        assert_eq!(preview.len(), 5);
        assert_eq!(preview[4]["first_name"].as_deref(), Some("p5"));
        assert_eq!(preview[0]["notes"], None);
    }

    #[test]
    fn sanitize_strips_directories_and_dots() {
        assert_eq!(sanitize_file_name("C:\\temp\\a b.xlsx"), "a_b.xlsx");
        assert_eq!(sanitize_file_name(".hidden.csv"), "hidden.csv");
        assert_eq!(sanitize_file_name("///"), "upload");
    }
}
