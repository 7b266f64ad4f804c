//! Cleanup of derived images.
//!
//! Deletes every file under `{root}/{album|artist}/{slug}/` whose name ends
//! in `-{size}.jpg` for a configured size name, leaving source images and
//! metadata in place. Used when a collection moves from pre-generated to
//! on-demand derivation. Running it twice is harmless.
//!
//! A dry run reports the same list without touching the filesystem. Source
//! images (`-hi-res.jpg`) never match, whatever the size table says.

use crate::naming::derived_size_of;
use crate::scan::ScanError;
use crate::sizes::SizePolicy;
use crate::types::EntityKind;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
#[error("failed to remove {path}: {source}")]
pub struct CleanError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Default, Serialize)]
pub struct CleanSummary {
    pub dry_run: bool,
    /// Deleted files, or files that would be deleted in a dry run.
    pub removed: Vec<PathBuf>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<CleanError>,
}

fn serialize_errors<S: Serializer>(errors: &[CleanError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

impl CleanSummary {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CleanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would delete" } else { "deleted" };
        write!(f, "{} {} derived images", verb, self.removed.len())?;
        if !self.errors.is_empty() {
            write!(f, ", {} errors", self.errors.len())?;
        }
        Ok(())
    }
}

/// Remove (or list, with `dry_run`) derived images under `root`.
///
/// Only an unreadable collection root is fatal. Per-file failures are
/// collected in [`CleanSummary::errors`].
pub fn clean(root: &Path, policy: &SizePolicy, dry_run: bool) -> Result<CleanSummary, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut summary = CleanSummary {
        dry_run,
        ..Default::default()
    };

    for kind in EntityKind::ALL {
        let kind_dir = root.join(kind.as_str());
        if !kind_dir.is_dir() {
            continue;
        }
        let files = derived_files(&kind_dir, policy)?;
        remove_files(files, &mut summary);
    }

    Ok(summary)
}

/// Delete each path in order, recording failures and carrying on.
fn remove_files(paths: Vec<PathBuf>, summary: &mut CleanSummary) {
    for path in paths {
        if summary.dry_run {
            debug!(path = %path.display(), "would delete");
            summary.removed.push(path);
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted");
                summary.removed.push(path);
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "delete failed");
                summary.errors.push(CleanError { path, source });
            }
        }
    }
}

/// Files inside entity directories named like a derived image, sorted.
/// Hidden entity directories are skipped, as in [`crate::scan`].
fn derived_files(kind_dir: &Path, policy: &SizePolicy) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(kind_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() != 1 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: kind_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if derived_size_of(name, policy.names()).is_some() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_collection;
    use tempfile::TempDir;

    fn with_derived() -> TempDir {
        let tmp = setup_collection(&[
            (EntityKind::Album, "x", Some((16, 16))),
            (EntityKind::Artist, "y", Some((16, 16))),
        ]);
        for file in ["album/x/x-medium.jpg", "album/x/x-small.jpg", "artist/y/y-avatar.jpg"] {
            fs::write(tmp.path().join(file), "derived").unwrap();
        }
        tmp
    }

    #[test]
    fn deletes_derived_and_keeps_sources() {
        let tmp = with_derived();
        let summary = clean(tmp.path(), &SizePolicy::standard(), false).unwrap();

        assert_eq!(summary.removed.len(), 3);
        assert!(summary.is_success());
        assert!(!tmp.path().join("album/x/x-medium.jpg").exists());
        assert!(!tmp.path().join("artist/y/y-avatar.jpg").exists());
        assert!(tmp.path().join("album/x/x-hi-res.jpg").is_file());
        assert!(tmp.path().join("album/x/x.json").is_file());
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let tmp = with_derived();
        let summary = clean(tmp.path(), &SizePolicy::standard(), true).unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.removed.len(), 3);
        assert!(tmp.path().join("album/x/x-medium.jpg").is_file());
        assert!(tmp.path().join("artist/y/y-avatar.jpg").is_file());
    }

    #[test]
    fn second_run_finds_nothing() {
        let tmp = with_derived();
        clean(tmp.path(), &SizePolicy::standard(), false).unwrap();
        let summary = clean(tmp.path(), &SizePolicy::standard(), false).unwrap();
        assert!(summary.removed.is_empty());
    }

    #[test]
    fn ignores_unconfigured_sizes_and_other_files() {
        let tmp = with_derived();
        for file in ["album/x/x-huge.jpg", "album/x/x-medium.png", "album/x/notes.txt"] {
            fs::write(tmp.path().join(file), "other").unwrap();
        }
        fs::write(tmp.path().join("album/stray-medium.jpg"), "not in an entity").unwrap();

        let summary = clean(tmp.path(), &SizePolicy::standard(), false).unwrap();

        assert_eq!(summary.removed.len(), 3);
        assert!(tmp.path().join("album/x/x-huge.jpg").is_file());
        assert!(tmp.path().join("album/x/x-medium.png").is_file());
        assert!(tmp.path().join("album/stray-medium.jpg").is_file());
    }

    #[test]
    fn removed_paths_are_sorted_within_kind() {
        let tmp = with_derived();
        let summary = clean(tmp.path(), &SizePolicy::standard(), true).unwrap();
        let names: Vec<_> = summary
            .removed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x-medium.jpg", "x-small.jpg", "y-avatar.jpg"]);
    }

    #[test]
    fn summary_display() {
        let tmp = with_derived();
        let dry = clean(tmp.path(), &SizePolicy::standard(), true).unwrap();
        assert_eq!(dry.to_string(), "would delete 3 derived images");
        let real = clean(tmp.path(), &SizePolicy::standard(), false).unwrap();
        assert_eq!(real.to_string(), "deleted 3 derived images");
    }

    #[test]
    fn skips_hidden_entity_directories() {
        let tmp = with_derived();
        let hidden = tmp.path().join("album/.cache");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("x-medium.jpg"), "cached").unwrap();

        let summary = clean(tmp.path(), &SizePolicy::standard(), false).unwrap();

        assert_eq!(summary.removed.len(), 3);
        assert!(hidden.join("x-medium.jpg").is_file());
    }

    #[test]
    fn failed_delete_is_recorded_and_walk_continues() {
        let tmp = with_derived();
        let gone = tmp.path().join("album/x/x-medium.jpg");
        let kept = tmp.path().join("album/x/x-small.jpg");
        fs::remove_file(&gone).unwrap();

        let mut summary = CleanSummary::default();
        remove_files(vec![gone.clone(), kept.clone()], &mut summary);

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].path, gone);
        assert_eq!(summary.errors[0].source.kind(), io::ErrorKind::NotFound);
        assert_eq!(summary.removed, vec![kept.clone()]);
        assert!(!kept.exists());
        assert!(!summary.is_success());
        assert_eq!(summary.to_string(), "deleted 1 derived images, 1 errors");
    }

    #[cfg(unix)]
    #[test]
    fn read_only_entity_directory_fails_cleanly() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = with_derived();
        let locked = tmp.path().join("album/x");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        // Privileged users ignore directory permissions.
        if fs::write(locked.join("write-check"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let summary = clean(tmp.path(), &SizePolicy::standard(), false).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.removed.len(), 1);
        assert!(!tmp.path().join("artist/y/y-avatar.jpg").exists());
        assert!(!summary.is_success());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = clean(&tmp.path().join("nope"), &SizePolicy::standard(), true);
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }
}
