//! Bundle assembly and file storage.
//!
//! Bundles are written once as `fhir_bundle_<id>.json` under the bundle directory and are
//! immutable afterwards. Lookups by id go through [`ResourceId::parse`], so an id can never
//! name a path outside the directory.

use crate::constants::{BUNDLE_FILENAME_PREFIX, CSV_EXPORT_HEADER, JSON_EXTENSION};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use codebridge_uuid::ResourceId;
use fhir::{Bundle, Resource};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Collects resources into a collection bundle.
#[derive(Clone, Copy, Debug, Default)]
pub struct BundleAssembler;

impl BundleAssembler {
    /// New bundle with a fresh id and the current time.
    pub fn assemble(resources: impl IntoIterator<Item = Resource>) -> Bundle {
        Self::assemble_at(ResourceId::new(), Utc::now(), resources)
    }

    /// Bundle stamped with `timestamp`, truncated to whole seconds.
    pub fn assemble_at(
        id: ResourceId,
        timestamp: DateTime<Utc>,
        resources: impl IntoIterator<Item = Resource>,
    ) -> Bundle {
        Bundle::collection(id, timestamp.trunc_subsecs(0), resources)
    }
}

/// Bundle files under one directory.
#[derive(Clone, Debug)]
pub struct BundleStore {
    dir: PathBuf,
}

impl BundleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the bundle file for `id`.
    pub fn bundle_path(&self, id: ResourceId) -> PathBuf {
        self.dir
            .join(format!("{BUNDLE_FILENAME_PREFIX}{id}.{JSON_EXTENSION}"))
    }

    /// Write `bundle` to its file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BundleExists`] if a file for this id is already present, and
    /// [`CoreError::DirCreation`] / [`CoreError::FileWrite`] on I/O failure.
    pub fn save(&self, bundle: &Bundle) -> CoreResult<PathBuf> {
        let path = self.bundle_path(bundle.id);
        write_new(&self.dir, &path, bundle.render()?.as_bytes())?;
        tracing::info!(
            bundle_id = %bundle.id,
            entries = bundle.len(),
            path = %path.display(),
            "bundle written"
        );
        Ok(path)
    }

    /// Load the bundle stored for `id`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Uuid`] if `id` is not a canonical identifier, and a read or parse
    /// error if the file exists but cannot be loaded.
    pub fn load(&self, id: &str) -> CoreResult<Option<Bundle>> {
        let id = ResourceId::parse(id)?;
        let path = self.bundle_path(id);

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CoreError::FileRead { path, source }),
        };
        Ok(Some(Bundle::parse(&text)?))
    }

    /// Load the bundle for `id` and render it as a CSV summary.
    pub fn export_csv(&self, id: &str) -> CoreResult<Option<String>> {
        self.load(id)?.map(|bundle| export_csv(&bundle)).transpose()
    }
}

/// Write each resource to `<dir>/<type>_<n>.json`, `n` counting from 1 in the given order.
///
/// Existing files with the same names are replaced.
///
/// # Errors
///
/// Fails on the first resource that cannot be written; files written before it remain.
pub fn save_individual<'a>(
    resources: impl IntoIterator<Item = &'a Resource>,
    dir: &Path,
) -> CoreResult<Vec<PathBuf>> {
    create_dir(dir)?;
    let mut written = Vec::new();
    for (i, resource) in resources.into_iter().enumerate() {
        let name = format!(
            "{}_{}.{JSON_EXTENSION}",
            resource.kind().as_str().to_lowercase(),
            i + 1
        );
        let path = dir.join(name);
        let json = serde_json::to_string_pretty(resource).map_err(CoreError::Serialization)?;
        fs::write(&path, json).map_err(|source| CoreError::FileWrite {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    tracing::info!(dir = %dir.display(), files = written.len(), "resources written");
    Ok(written)
}

/// CSV summary of a bundle: one line per entry with the bundle timestamp.
pub fn export_csv(bundle: &Bundle) -> CoreResult<String> {
    let created = bundle.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_EXPORT_HEADER)?;
    for resource in bundle.resources() {
        let id = resource.id().to_string();
        writer.write_record([resource.kind().as_str(), id.as_str(), created.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CoreError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|e| CoreError::InvalidInput(format!("CSV export is not UTF-8: {e}")))
}

fn create_dir(dir: &Path) -> CoreResult<()> {
    fs::create_dir_all(dir).map_err(|source| CoreError::DirCreation {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_new(dir: &Path, path: &Path, contents: &[u8]) -> CoreResult<()> {
    create_dir(dir)?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(CoreError::BundleExists(path.to_path_buf()));
        }
        Err(source) => {
            return Err(CoreError::FileWrite {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let written = file.write_all(contents).and_then(|()| file.sync_all());
    drop(file);
    discard_on_error(path, written)
}

/// Removes a partially written file so its id reads as absent rather than corrupt.
fn discard_on_error(path: &Path, result: std::io::Result<()>) -> CoreResult<()> {
    result.map_err(|source| {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial file");
        }
        CoreError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}
