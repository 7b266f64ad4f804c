//! Shared test utilities for the sleeve test suite.
//!
//! Provides synthetic image encoders and a collection builder that lays out
//! entity directories the way the ingestion process does.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_collection(&[
//!     (EntityKind::Album, "foo", Some((300, 200))),
//!     (EntityKind::Artist, "bar", None),
//! ]);
//! assert!(tmp.path().join("album/foo/foo-hi-res.jpg").is_file());
//! ```

use image::{DynamicImage, ImageFormat, RgbImage};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::naming::{entity_dir, source_path_for};
use crate::types::EntityKind;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    gradient(width, height).write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// A valid JPEG of the given dimensions, in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

/// A valid PNG of the given dimensions, in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// Write a valid JPEG to `path`, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, jpeg_bytes(width, height)).unwrap();
}

// =========================================================================
// Collection fixtures
// =========================================================================

/// Build a collection root in a temp directory.
///
/// Each entry is `(kind, slug, source dimensions)`. `None` creates the entity
/// directory with only a metadata file and no source image.
pub fn setup_collection(entities: &[(EntityKind, &str, Option<(u32, u32)>)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (kind, slug, source) in entities {
        let dir = tmp.path().join(entity_dir(slug, *kind));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{slug}.json")), "{}").unwrap();
        if let Some((w, h)) = source {
            create_test_jpeg(&tmp.path().join(source_path_for(slug, *kind)), *w, *h);
        }
    }
    tmp
}

/// Set a file's modification time relative to now (negative = past).
pub fn set_mtime_offset(path: &Path, offset_secs: i64) {
    let now = SystemTime::now();
    let delta = Duration::from_secs(offset_secs.unsigned_abs());
    let time = if offset_secs < 0 { now - delta } else { now + delta };
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}
