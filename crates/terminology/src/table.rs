//! Terminology table loading.

use std::path::{Path, PathBuf};

use codebridge_ingest::{read_table, Table, TableRow};

use crate::systems::{CodeSystem, DISEASE_COLUMN_ALIASES};
use crate::{TerminologyError, TerminologyResult};

/// Candidate sources, highest priority first: the packaged sample dataset, then a generic
/// workbook, then generic delimited text.
pub const DEFAULT_CANDIDATES: [&str; 3] = ["mapping 4.xlsx", "code_mappings.xlsx", "code_mappings.csv"];

/// A loaded reference table mapping disease names to codes across systems.
///
/// Column positions are resolved once at load time through the alias lists, so lookups never
/// re-scan headers. Immutable after construction.
#[derive(Clone, Debug)]
pub struct TerminologyTable {
    table: Table,
    source: PathBuf,
    disease_column: Option<usize>,
    code_columns: [Option<usize>; 5],
}

impl TerminologyTable {
    /// Wrap an already-read table.
    pub fn from_table(table: Table, source: impl Into<PathBuf>) -> Self {
        let disease_column = table.find_column(DISEASE_COLUMN_ALIASES);
        let code_columns = CodeSystem::MAPPED.map(|s| table.find_column(s.column_aliases()));
        Self {
            table,
            source: source.into(),
            disease_column,
            code_columns,
        }
    }

    /// Load a single source.
    ///
    /// # Errors
    ///
    /// Returns [`TerminologyError::SourceNotFound`] if `path` does not exist and
    /// [`TerminologyError::Ingest`] if it cannot be parsed.
    pub fn load_from(path: &Path) -> TerminologyResult<Self> {
        if !path.exists() {
            return Err(TerminologyError::SourceNotFound(path.to_path_buf()));
        }
        let table = read_table(path)?;
        Ok(Self::from_table(table, path))
    }

    /// Load from the first candidate that exists and parses.
    ///
    /// A candidate that exists but fails to parse is skipped with a warning. Returns `None`
    /// when no candidate is usable; the mapper then answers every lookup with "no match".
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Option<Self> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.exists() {
                tracing::debug!(path = %path.display(), "terminology candidate absent");
                continue;
            }

            match Self::load_from(path) {
                Ok(table) => {
                    tracing::info!(
                        path = %path.display(),
                        rows = table.len(),
                        has_disease_column = table.disease_column.is_some(),
                        "terminology table loaded"
                    );
                    return Some(table);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable terminology source");
                }
            }
        }

        tracing::info!("no terminology source available; code mapping disabled");
        None
    }

    /// Path the table was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub(crate) fn rows(&self) -> &[TableRow] {
        self.table.rows()
    }

    pub(crate) fn disease_column(&self) -> Option<usize> {
        self.disease_column
    }

    /// Column holding codes for `system`, if the table has one.
    pub(crate) fn code_column(&self, system: CodeSystem) -> Option<usize> {
        CodeSystem::MAPPED
            .iter()
            .position(|s| *s == system)
            .and_then(|i| self.code_columns[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolves_aliased_columns() {
        let mut table = Table::new(["Condition Name", "ICD 11", "Ayurveda Code", "SNOMED"]);
        table.push_cells([Some("Diabetes"), Some("5A11"), Some("AY01"), Some("44054006")]);
        let terminology = TerminologyTable::from_table(table, "inline");

        assert_eq!(terminology.disease_column(), Some(0));
        assert_eq!(terminology.code_column(CodeSystem::Icd11), Some(1));
        assert_eq!(terminology.code_column(CodeSystem::Ayurveda), Some(2));
        assert_eq!(terminology.code_column(CodeSystem::Snomed), Some(3));
        assert_eq!(terminology.code_column(CodeSystem::Siddha), None);
        assert_eq!(terminology.code_column(CodeSystem::Loinc), None);
    }

    #[test]
    fn load_uses_first_existing_candidate() {
        let tmp = TempDir::new().expect("tempdir");
        let first = tmp.path().join("code_mappings.xlsx");
        let second = tmp.path().join("code_mappings.csv");
        fs::write(&second, "disease,icd11\nAsthma,CA23\n").expect("write csv");

        let table = TerminologyTable::load(&[first, second.clone()]).expect("table loaded");
        assert_eq!(table.source(), second.as_path());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unparseable_candidate_falls_through() {
        let tmp = TempDir::new().expect("tempdir");
        let broken = tmp.path().join("mapping 4.xlsx");
        fs::write(&broken, b"definitely not a workbook").expect("write broken");
        let good = tmp.path().join("code_mappings.csv");
        fs::write(&good, "Disease,Unani\nFever,UN-7\n").expect("write csv");

        let table = TerminologyTable::load(&[broken, good.clone()]).expect("table loaded");
        assert_eq!(table.source(), good.as_path());
    }

    #[test]
    fn no_candidates_means_absent() {
        let tmp = TempDir::new().expect("tempdir");
        let missing = [tmp.path().join("a.csv"), tmp.path().join("b.xlsx")];
        assert!(TerminologyTable::load(&missing).is_none());
    }

    #[test]
    fn load_from_missing_path_errors() {
        let tmp = TempDir::new().expect("tempdir");
        match TerminologyTable::load_from(&tmp.path().join("nope.csv")) {
            Err(TerminologyError::SourceNotFound(p)) => assert!(p.ends_with("nope.csv")),
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
    }
}
