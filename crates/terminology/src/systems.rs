//! Coding systems known to the mapper and the URIs they are emitted under.

use std::collections::BTreeMap;
use std::fmt;

/// Header aliases for the disease/condition name column.
pub const DISEASE_COLUMN_ALIASES: &[&str] = &["disease", "condition", "condition_name", "disease_name"];

/// A coding system a condition or measurement can be coded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CodeSystem {
    /// SNOMED CT, the primary condition coding.
    Snomed,
    /// WHO ICD-11 for Mortality and Morbidity Statistics.
    Icd11,
    /// AYUSH Ayurveda.
    Ayurveda,
    /// AYUSH Siddha.
    Siddha,
    /// AYUSH Unani.
    Unani,
    /// LOINC, used for measurements only.
    Loinc,
}

impl CodeSystem {
    /// The primary condition coding system.
    pub const PRIMARY: CodeSystem = CodeSystem::Snomed;

    /// Secondary condition coding systems, in the order their codings are emitted.
    pub const SECONDARY: [CodeSystem; 4] = [
        CodeSystem::Icd11,
        CodeSystem::Ayurveda,
        CodeSystem::Siddha,
        CodeSystem::Unani,
    ];

    /// The five systems a terminology row carries codes for.
    pub const MAPPED: [CodeSystem; 5] = [
        CodeSystem::Snomed,
        CodeSystem::Icd11,
        CodeSystem::Ayurveda,
        CodeSystem::Siddha,
        CodeSystem::Unani,
    ];

    /// Short key used in configuration and API responses.
    pub fn key(self) -> &'static str {
        match self {
            CodeSystem::Snomed => "snomed",
            CodeSystem::Icd11 => "icd11",
            CodeSystem::Ayurveda => "ayurveda",
            CodeSystem::Siddha => "siddha",
            CodeSystem::Unani => "unani",
            CodeSystem::Loinc => "loinc",
        }
    }

    /// Parse a short key (case-insensitive).
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        [
            CodeSystem::Snomed,
            CodeSystem::Icd11,
            CodeSystem::Ayurveda,
            CodeSystem::Siddha,
            CodeSystem::Unani,
            CodeSystem::Loinc,
        ]
        .into_iter()
        .find(|s| s.key() == key)
    }

    /// Default system URI.
    ///
    /// The AYUSH URIs are provisional and can be overridden through [`CodeSystems`].
    pub fn default_uri(self) -> &'static str {
        match self {
            CodeSystem::Snomed => "http://snomed.info/sct",
            CodeSystem::Icd11 => "http://id.who.int/icd/release/11/mms",
            CodeSystem::Ayurveda => "https://nrces.in/terminology/CodeSystem/ayush-ayurveda",
            CodeSystem::Siddha => "https://nrces.in/terminology/CodeSystem/ayush-siddha",
            CodeSystem::Unani => "https://nrces.in/terminology/CodeSystem/ayush-unani",
            CodeSystem::Loinc => "http://loinc.org",
        }
    }

    /// Header aliases for this system's code column in a terminology table.
    pub fn column_aliases(self) -> &'static [&'static str] {
        match self {
            CodeSystem::Snomed => &["snomed", "snomed_code", "snomed_ct"],
            CodeSystem::Icd11 => &["icd11", "icd_11", "icd11_code"],
            CodeSystem::Ayurveda => &["ayurveda", "ayurveda_code"],
            CodeSystem::Siddha => &["siddha", "siddha_code"],
            CodeSystem::Unani => &["unani", "unani_code"],
            CodeSystem::Loinc => &["loinc", "loinc_code"],
        }
    }
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// System URI registry: defaults plus operator overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeSystems {
    overrides: BTreeMap<CodeSystem, String>,
}

impl CodeSystems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the URI for `system`. Blank URIs are ignored.
    pub fn with_override(mut self, system: CodeSystem, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        if !uri.trim().is_empty() {
            self.overrides.insert(system, uri.trim().to_string());
        }
        self
    }

    /// The URI emitted for `system`.
    pub fn uri(&self, system: CodeSystem) -> &str {
        self.overrides
            .get(&system)
            .map(String::as_str)
            .unwrap_or_else(|| system.default_uri())
    }

    /// Every system keyed by its short key, as returned alongside mapping results.
    pub fn as_map(&self) -> BTreeMap<&'static str, String> {
        [
            CodeSystem::Icd11,
            CodeSystem::Snomed,
            CodeSystem::Loinc,
            CodeSystem::Ayurveda,
            CodeSystem::Siddha,
            CodeSystem::Unani,
        ]
        .into_iter()
        .map(|s| (s.key(), self.uri(s).to_string()))
        .collect()
    }
}
