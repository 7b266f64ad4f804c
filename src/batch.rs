//! Batch derivation for static deployment.
//!
//! Walks every entity the [`scan`](crate::scan) stage finds and writes one
//! derived image per size class next to (or, with an output directory,
//! mirrored away from) the source image:
//!
//! ```text
//! public/album/kind-of-blue-1959/
//! ├── kind-of-blue-1959-hi-res.jpg   # read
//! ├── kind-of-blue-1959-medium.jpg   # written
//! ├── kind-of-blue-1959-small.jpg    # written
//! └── kind-of-blue-1959-avatar.jpg   # written
//! ```
//!
//! ## Regeneration rules
//!
//! | Mode | Freshness check | Destination |
//! |---|---|---|
//! | in place (default) | skip entities whose outputs are newer than the source | entity directory |
//! | `force` | none, always regenerate | entity directory |
//! | `output` dir | none, always regenerate | `{output}/{kind}/{slug}/` |
//!
//! ## Failure isolation
//!
//! Every entity yields exactly one [`EntityOutcome`]. A missing source is a
//! skip, not a failure. Read, decode and write errors mark that entity
//! failed and the walk moves on. The aggregate [`BatchSummary`] is the only
//! result; nothing is counted in shared state.
//!
//! Entities are independent, so they are processed in parallel with rayon.
//! Outputs are written to a hidden temp file in the destination directory
//! and renamed into place.

use crate::freshness::is_up_to_date;
use crate::imaging::{BackendError, ImageBackend, RustBackend};
use crate::naming::{expected_output_paths, source_path_for};
use crate::scan::{self, Entity, ScanError};
use crate::sizes::SizePolicy;
use crate::types::EntityKind;
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single entity could not be derived.
#[derive(Error, Debug)]
pub enum EntityError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{size}: {source}")]
    Decode {
        size: String,
        #[source]
        source: BackendError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Mirror outputs under this directory instead of writing in place.
    pub output: Option<PathBuf>,
    /// Regenerate in place even when outputs look fresh.
    pub force: bool,
}

impl BatchOptions {
    fn checks_freshness(&self) -> bool {
        self.output.is_none() && !self.force
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Generated,
    UpToDate,
    MissingSource,
    Failed,
}

impl EntityStatus {
    pub fn label(self) -> &'static str {
        match self {
            EntityStatus::Generated => "generated",
            EntityStatus::UpToDate => "up to date",
            EntityStatus::MissingSource => "no source image",
            EntityStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Generated { outputs: Vec<PathBuf> },
    UpToDate,
    MissingSource,
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: EntityError,
    },
}

impl EntityOutcome {
    pub fn status(&self) -> EntityStatus {
        match self {
            EntityOutcome::Generated { .. } => EntityStatus::Generated,
            EntityOutcome::UpToDate => EntityStatus::UpToDate,
            EntityOutcome::MissingSource => EntityStatus::MissingSource,
            EntityOutcome::Failed { .. } => EntityStatus::Failed,
        }
    }
}

fn serialize_error<S: Serializer>(error: &EntityError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Serialize)]
pub struct EntityReport {
    pub kind: EntityKind,
    pub slug: String,
    #[serde(flatten)]
    pub outcome: EntityOutcome,
}

/// Progress event sent as each entity finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        entities: usize,
    },
    EntityFinished {
        kind: EntityKind,
        slug: String,
        status: EntityStatus,
        /// Size names written, or the error message for failures.
        detail: Vec<String>,
    },
}

impl BatchEvent {
    fn finished(report: &EntityReport, policy: &SizePolicy) -> Self {
        let detail = match &report.outcome {
            EntityOutcome::Generated { .. } => policy.names().map(str::to_string).collect(),
            EntityOutcome::Failed { error } => vec![error.to_string()],
            EntityOutcome::UpToDate | EntityOutcome::MissingSource => Vec::new(),
        };
        BatchEvent::EntityFinished {
            kind: report.kind,
            slug: report.slug.clone(),
            status: report.outcome.status(),
            detail,
        }
    }
}

/// Aggregate result of one batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub generated: usize,
    pub up_to_date: usize,
    pub missing_source: usize,
    pub failed: usize,
    pub entities: Vec<EntityReport>,
}

impl BatchSummary {
    fn from_reports(entities: Vec<EntityReport>) -> Self {
        let mut summary = BatchSummary::default();
        for report in &entities {
            match report.outcome.status() {
                EntityStatus::Generated => summary.generated += 1,
                EntityStatus::UpToDate => summary.up_to_date += 1,
                EntityStatus::MissingSource => summary.missing_source += 1,
                EntityStatus::Failed => summary.failed += 1,
            }
        }
        summary.entities = entities;
        summary
    }

    pub fn total(&self) -> usize {
        self.entities.len()
    }

    /// True when no entity failed. Missing sources do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&EntityReport, &EntityError)> {
        self.entities.iter().filter_map(|report| match &report.outcome {
            EntityOutcome::Failed { error } => Some((report, error)),
            _ => None,
        })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} generated, {} up to date, {} missing source, {} failed ({} total)",
            self.generated,
            self.up_to_date,
            self.missing_source,
            self.failed,
            self.total()
        )
    }
}

/// Derive every entity under `root` with the pure Rust backend.
pub fn derive_all(
    root: &Path,
    policy: &SizePolicy,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, ScanError> {
    derive_all_with_backend(&RustBackend::new(), root, policy, options, events)
}

/// Derive every entity using a specific backend (allows testing with mock).
///
/// Fails only if the collection cannot be scanned; per-entity problems end up
/// in the summary. Dropping `events` at return closes the channel.
pub fn derive_all_with_backend(
    backend: &impl ImageBackend,
    root: &Path,
    policy: &SizePolicy,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, ScanError> {
    let entities = scan::scan(root)?;
    info!(root = %root.display(), entities = entities.len(), "deriving collection");

    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            entities: entities.len(),
        })
        .ok();
    }

    let reports: Vec<EntityReport> = entities
        .par_iter()
        .map(|entity| {
            let report = EntityReport {
                kind: entity.kind,
                slug: entity.slug.clone(),
                outcome: derive_entity(backend, root, entity, policy, options),
            };
            if let EntityOutcome::Failed { error } = &report.outcome {
                warn!(kind = %entity.kind, slug = %entity.slug, %error, "entity failed");
            }
            if let Some(tx) = &events {
                tx.send(BatchEvent::finished(&report, policy)).ok();
            }
            report
        })
        .collect();

    let summary = BatchSummary::from_reports(reports);
    info!(%summary, "batch complete");
    Ok(summary)
}

fn derive_entity(
    backend: &impl ImageBackend,
    root: &Path,
    entity: &Entity,
    policy: &SizePolicy,
    options: &BatchOptions,
) -> EntityOutcome {
    let Some(source) = &entity.source else {
        debug!(kind = %entity.kind, slug = %entity.slug, "no source image, skipping");
        return EntityOutcome::MissingSource;
    };
    let Some(outputs) = output_paths(root, entity, policy, options) else {
        return EntityOutcome::MissingSource;
    };

    if options.checks_freshness() && is_up_to_date(source, outputs.as_slice()) {
        debug!(kind = %entity.kind, slug = %entity.slug, "up to date");
        return EntityOutcome::UpToDate;
    }

    match write_sizes(backend, source, &outputs, policy) {
        Ok(()) => EntityOutcome::Generated { outputs },
        Err(error) => EntityOutcome::Failed { error },
    }
}

/// Output paths in policy order, rerooted under the output directory if set.
fn output_paths(
    root: &Path,
    entity: &Entity,
    policy: &SizePolicy,
    options: &BatchOptions,
) -> Option<Vec<PathBuf>> {
    let base = options.output.as_deref().unwrap_or(root);
    let relative = expected_output_paths(
        &source_path_for(&entity.slug, entity.kind),
        policy.names(),
    )?;
    Some(
        policy
            .names()
            .filter_map(|name| relative.get(name))
            .map(|path| base.join(path))
            .collect(),
    )
}

/// Read the source once, then resize and write each size in order.
fn write_sizes(
    backend: &impl ImageBackend,
    source: &Path,
    outputs: &[PathBuf],
    policy: &SizePolicy,
) -> Result<(), EntityError> {
    let bytes = fs::read(source).map_err(|e| EntityError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    for (class, output) in policy.classes().iter().zip(outputs) {
        let encoded = backend
            .derive(&bytes, &class.params())
            .map_err(|e| EntityError::Decode {
                size: class.name.clone(),
                source: e,
            })?;
        write_atomic(output, &encoded).map_err(|e| EntityError::Write {
            path: output.clone(),
            source: e,
        })?;
        debug!(output = %output.display(), bytes = encoded.len(), "wrote");
    }
    Ok(())
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name")
    })?;
    fs::create_dir_all(dir)?;

    let tmp = dir.join(format!(".{}.tmp", name.to_string_lossy()));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        fs::remove_file(&tmp).ok();
    })
}
