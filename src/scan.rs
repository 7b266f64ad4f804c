//! Collection discovery.
//!
//! Enumerates entity directories under the collection root:
//!
//! ```text
//! public/                          # Collection root
//! ├── album/
//! │   ├── kind-of-blue-1959/       # One entity per directory
//! │   │   ├── kind-of-blue-1959-hi-res.jpg
//! │   │   └── kind-of-blue-1959.json
//! │   └── a-love-supreme-1965/     # Source may be missing
//! │       └── a-love-supreme-1965.json
//! └── artist/
//!     └── miles-davis/
//!         └── miles-davis-hi-res.jpg
//! ```
//!
//! The directory name is the slug. A missing `album/` or `artist/` directory
//! is an empty kind, not an error. Plain files directly under a kind
//! directory are ignored, as are hidden entries.

use crate::naming::source_path_for;
use crate::types::EntityKind;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Collection root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// One entity directory in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub slug: String,
    /// Absolute (root-joined) entity directory.
    pub dir: PathBuf,
    /// Root-joined source image path, if the file exists.
    pub source: Option<PathBuf>,
}

impl Entity {
    /// Where the source image would live, whether or not it exists.
    pub fn expected_source(&self, root: &Path) -> PathBuf {
        root.join(source_path_for(&self.slug, self.kind))
    }
}

/// List every entity under `root`, albums first, each kind sorted by slug.
pub fn scan(root: &Path) -> Result<Vec<Entity>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut entities = Vec::new();
    for kind in EntityKind::ALL {
        let kind_dir = root.join(kind.as_str());
        if !kind_dir.is_dir() {
            continue;
        }
        for slug in entity_slugs(&kind_dir)? {
            let source = root.join(source_path_for(&slug, kind));
            entities.push(Entity {
                kind,
                dir: kind_dir.join(&slug),
                source: source.is_file().then_some(source),
                slug,
            });
        }
    }
    Ok(entities)
}

/// Directory names one level below `kind_dir`, sorted.
fn entity_slugs(kind_dir: &Path) -> Result<Vec<String>, ScanError> {
    let mut slugs = Vec::new();
    let walker = WalkDir::new(kind_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: kind_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        // Non-UTF-8 names can never match a request path.
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        slugs.push(name.to_string());
    }
    Ok(slugs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_collection;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_entities_of_both_kinds_in_order() {
        let tmp = setup_collection(&[
            (EntityKind::Artist, "miles-davis", Some((64, 64))),
            (EntityKind::Album, "kind-of-blue-1959", Some((64, 64))),
            (EntityKind::Album, "a-love-supreme-1965", Some((64, 64))),
        ]);

        let entities = scan(tmp.path()).unwrap();
        let names: Vec<_> = entities
            .iter()
            .map(|e| format!("{}/{}", e.kind, e.slug))
            .collect();
        assert_eq!(
            names,
            vec![
                "album/a-love-supreme-1965",
                "album/kind-of-blue-1959",
                "artist/miles-davis",
            ]
        );
    }

    #[test]
    fn source_is_none_when_missing() {
        let tmp = setup_collection(&[
            (EntityKind::Album, "with", Some((32, 32))),
            (EntityKind::Album, "without", None),
        ]);

        let entities = scan(tmp.path()).unwrap();
        assert_eq!(
            entities[0].source.as_deref(),
            Some(tmp.path().join("album/with/with-hi-res.jpg").as_path())
        );
        assert_eq!(entities[1].source, None);
        assert_eq!(
            entities[1].expected_source(tmp.path()),
            tmp.path().join("album/without/without-hi-res.jpg")
        );
    }

    #[test]
    fn missing_kind_directory_is_empty() {
        let tmp = setup_collection(&[(EntityKind::Artist, "solo", Some((32, 32)))]);
        let entities = scan(tmp.path()).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].kind, EntityKind::Artist);
    }

    #[test]
    fn ignores_files_and_hidden_directories() {
        let tmp = setup_collection(&[(EntityKind::Album, "real", None)]);
        fs::write(tmp.path().join("album/stray.jpg"), "x").unwrap();
        fs::create_dir_all(tmp.path().join("album/.cache")).unwrap();
        fs::create_dir_all(tmp.path().join("other/ignored")).unwrap();

        let entities = scan(tmp.path()).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].slug, "real");
    }

    #[test]
    fn empty_root_has_no_entities() {
        let tmp = TempDir::new().unwrap();
        assert!(scan(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan(&tmp.path().join("nope"));
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }
}
