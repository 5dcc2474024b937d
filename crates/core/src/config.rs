//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses. The `*_from_env_value` helpers take the raw value so binaries own the
//! `std::env` calls.

use crate::constants::{DEFAULT_COUNTRY, SYSTEM_OVERRIDE_ENV_PREFIX};
use crate::{CoreError, CoreResult};
use codebridge_terminology::{CodeSystem, CodeSystems, DEFAULT_CANDIDATES};
use std::path::{Path, PathBuf};

/// Where Observation and Condition subject references point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubjectLinking {
    /// Each subject reference gets its own freshly generated id.
    #[default]
    Detached,
    /// Subject references point at the Patient produced from the same row.
    Linked,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    bundle_data_dir: PathBuf,
    upload_dir: PathBuf,
    terminology_candidates: Vec<PathBuf>,
    code_systems: CodeSystems,
    default_country: String,
    subject_linking: SubjectLinking,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        bundle_data_dir: PathBuf,
        upload_dir: PathBuf,
        terminology_candidates: Vec<PathBuf>,
        code_systems: CodeSystems,
        default_country: String,
        subject_linking: SubjectLinking,
    ) -> CoreResult<Self> {
        let default_country = default_country.trim().to_string();
        if default_country.is_empty() {
            return Err(CoreError::InvalidInput(
                "default_country cannot be empty".into(),
            ));
        }

        Ok(Self {
            bundle_data_dir,
            upload_dir,
            terminology_candidates,
            code_systems,
            default_country,
            subject_linking,
        })
    }

    pub fn bundle_data_dir(&self) -> &Path {
        &self.bundle_data_dir
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Terminology sources to try, highest priority first.
    pub fn terminology_candidates(&self) -> &[PathBuf] {
        &self.terminology_candidates
    }

    pub fn code_systems(&self) -> &CodeSystems {
        &self.code_systems
    }

    pub fn default_country(&self) -> &str {
        &self.default_country
    }

    pub fn subject_linking(&self) -> SubjectLinking {
        self.subject_linking
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the terminology candidate list.
///
/// An operator-configured path, if any, is tried first; the built-in candidates follow.
pub fn terminology_candidates_from_env_value(value: Option<String>) -> Vec<PathBuf> {
    non_blank(value)
        .map(PathBuf::from)
        .into_iter()
        .chain(DEFAULT_CANDIDATES.iter().map(PathBuf::from))
        .collect()
}

/// Parse the subject linking mode.
///
/// If `value` is `None` or empty/whitespace, returns [`SubjectLinking::Detached`].
pub fn subject_linking_from_env_value(value: Option<String>) -> CoreResult<SubjectLinking> {
    let Some(value) = non_blank(value) else {
        return Ok(SubjectLinking::default());
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "linked" => Ok(SubjectLinking::Linked),
        "0" | "false" | "no" | "off" | "detached" => Ok(SubjectLinking::Detached),
        _ => Err(CoreError::InvalidInput(format!(
            "CODEBRIDGE_LINK_SUBJECTS must be a boolean, got '{value}'"
        ))),
    }
}

/// Resolve the default country; falls back to [`DEFAULT_COUNTRY`].
pub fn default_country_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
}

/// Collect code-system URI overrides from `CODEBRIDGE_SYSTEM_<KEY>` variables.
///
/// Variables with other prefixes are ignored; an unknown `<KEY>` is logged and ignored.
pub fn code_systems_from_env_vars<I>(vars: I) -> CodeSystems
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut systems = CodeSystems::new();
    for (name, value) in vars {
        let Some(key) = name.strip_prefix(SYSTEM_OVERRIDE_ENV_PREFIX) else {
            continue;
        };
        match CodeSystem::from_key(key) {
            Some(system) => systems = systems.with_override(system, value),
            None => tracing::warn!(variable = %name, "ignoring unknown code system override"),
        }
    }
    systems
}
