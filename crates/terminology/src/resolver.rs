//! Multi-key code mapping against a [`TerminologyTable`].

use std::sync::Arc;

use codebridge_ingest::TableRow;
use codebridge_types::NonEmptyText;
use serde::Serialize;

use crate::systems::{CodeSystem, CodeSystems};
use crate::table::TerminologyTable;

/// The equivalent codes of one terminology row.
///
/// Every member is `Some` only when the source cell was non-blank; empty strings never
/// appear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MappingResult {
    pub disease: Option<String>,
    pub snomed_code: Option<String>,
    pub icd11_code: Option<String>,
    pub ayurveda_code: Option<String>,
    pub siddha_code: Option<String>,
    pub unani_code: Option<String>,
}

impl MappingResult {
    /// Code for `system`; LOINC is never part of a terminology row.
    pub fn code(&self, system: CodeSystem) -> Option<&str> {
        match system {
            CodeSystem::Snomed => self.snomed_code.as_deref(),
            CodeSystem::Icd11 => self.icd11_code.as_deref(),
            CodeSystem::Ayurveda => self.ayurveda_code.as_deref(),
            CodeSystem::Siddha => self.siddha_code.as_deref(),
            CodeSystem::Unani => self.unani_code.as_deref(),
            CodeSystem::Loinc => None,
        }
    }

    fn code_slot(&mut self, system: CodeSystem) -> Option<&mut Option<String>> {
        match system {
            CodeSystem::Snomed => Some(&mut self.snomed_code),
            CodeSystem::Icd11 => Some(&mut self.icd11_code),
            CodeSystem::Ayurveda => Some(&mut self.ayurveda_code),
            CodeSystem::Siddha => Some(&mut self.siddha_code),
            CodeSystem::Unani => Some(&mut self.unani_code),
            CodeSystem::Loinc => None,
        }
    }
}

/// Lookup keys for [`CodeMapper::resolve_by_any`]. Blank keys are dropped on construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingQuery {
    disease: Option<NonEmptyText>,
    codes: Vec<(CodeSystem, NonEmptyText)>,
}

impl MappingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disease<S: AsRef<str>>(mut self, name: Option<S>) -> Self {
        self.disease = NonEmptyText::from_optional(name);
        self
    }

    /// Adds a code key. A later code for the same system replaces an earlier one.
    pub fn code<S: AsRef<str>>(mut self, system: CodeSystem, code: Option<S>) -> Self {
        self.codes.retain(|(s, _)| *s != system);
        if let Some(code) = NonEmptyText::from_optional(code) {
            self.codes.push((system, code));
        }
        self
    }

    pub fn disease_name(&self) -> Option<&str> {
        self.disease.as_ref().map(NonEmptyText::as_str)
    }

    /// True when no usable key was supplied.
    pub fn is_empty(&self) -> bool {
        self.disease.is_none() && self.codes.is_empty()
    }
}

/// Resolves disease names and codes to full terminology rows.
///
/// Cheap to clone; the table is shared.
#[derive(Clone, Debug, Default)]
pub struct CodeMapper {
    table: Option<Arc<TerminologyTable>>,
    systems: CodeSystems,
}

impl CodeMapper {
    pub fn new(table: Option<Arc<TerminologyTable>>, systems: CodeSystems) -> Self {
        Self { table, systems }
    }

    /// A mapper with no table: every lookup is a miss.
    pub fn empty(systems: CodeSystems) -> Self {
        Self::new(None, systems)
    }

    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }

    pub fn systems(&self) -> &CodeSystems {
        &self.systems
    }

    /// Looks a disease up by name.
    ///
    /// Case-insensitive exact match first, then case-insensitive substring match. In both
    /// passes the first row in table order wins.
    pub fn resolve_by_name(&self, name: &str) -> Option<MappingResult> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let table = self.table.as_deref()?;
        let column = table.disease_column()?;

        let row = find_exact(table, column, &needle)
            .or_else(|| find_substring(table, column, &needle))?;
        Some(extract(table, row))
    }

    /// Looks a row up by any combination of disease name and codes.
    ///
    /// Each supplied key whose column exists is an exact, case-insensitive match; keys are
    /// OR-combined and the first satisfying row wins. When nothing matches and a disease name
    /// was supplied, falls back to a substring match on the disease column.
    pub fn resolve_by_any(&self, query: &MappingQuery) -> Option<MappingResult> {
        if query.is_empty() {
            return None;
        }
        let table = self.table.as_deref()?;

        let mut keys: Vec<(usize, String)> = Vec::new();
        if let (Some(name), Some(column)) = (query.disease_name(), table.disease_column()) {
            keys.push((column, name.to_lowercase()));
        }
        for (system, code) in &query.codes {
            match table.code_column(*system) {
                Some(column) => keys.push((column, code.as_str().to_lowercase())),
                None => tracing::debug!(system = %system, "terminology table has no column"),
            }
        }

        let matched = table.rows().iter().find(|row| {
            keys.iter()
                .any(|(column, key)| cell_lower(row, *column).as_deref() == Some(key.as_str()))
        });

        let row = match matched {
            Some(row) => row,
            None => {
                let name = query.disease_name()?.to_lowercase();
                find_substring(table, table.disease_column()?, &name)?
            }
        };
        Some(extract(table, row))
    }
}

fn cell_lower(row: &TableRow, column: usize) -> Option<String> {
    row.cell(column).map(str::to_lowercase)
}

fn find_exact<'a>(table: &'a TerminologyTable, column: usize, needle: &str) -> Option<&'a TableRow> {
    table
        .rows()
        .iter()
        .find(|row| cell_lower(row, column).as_deref() == Some(needle))
}

fn find_substring<'a>(
    table: &'a TerminologyTable,
    column: usize,
    needle: &str,
) -> Option<&'a TableRow> {
    table
        .rows()
        .iter()
        .find(|row| cell_lower(row, column).is_some_and(|cell| cell.contains(needle)))
}

fn extract(table: &TerminologyTable, row: &TableRow) -> MappingResult {
    let field = |column: Option<usize>| column.and_then(|c| row.cell(c)).map(str::to_string);

    let mut result = MappingResult {
        disease: field(table.disease_column()),
        ..MappingResult::default()
    };
    for system in CodeSystem::MAPPED {
        if let Some(slot) = result.code_slot(system) {
            *slot = field(table.code_column(system));
        }
    }
    result
}
