//! Path derivation for source and derived images.
//!
//! Every entity directory follows one convention:
//!
//! ```text
//! {root}/{kind}/{slug}/
//! ├── {slug}-hi-res.jpg     # source image (never written here)
//! ├── {slug}-medium.jpg     # derived, one per size class
//! ├── {slug}-avatar.jpg
//! └── {slug}.json           # metadata, not our concern
//! ```
//!
//! and derived images are requested as `/{kind}/{slug}/{slug}-{size}.jpg`.
//!
//! All functions here are pure string/path transforms. Slugs are taken as-is:
//! they come from the upstream ingestion process and are neither sanitized
//! nor normalized.

use crate::types::EntityKind;
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Token that marks the authoritative source image of an entity.
pub const SOURCE_SUFFIX: &str = "hi-res";

/// Extension shared by source and derived images.
pub const IMAGE_EXTENSION: &str = "jpg";

/// A request path that names a derived image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedRequest {
    pub kind: EntityKind,
    pub slug: String,
    /// Size token as it appeared in the request. Not yet checked against the
    /// size policy.
    pub size: String,
}

impl DerivedRequest {
    /// Source image path relative to the collection root.
    pub fn source_path(&self) -> PathBuf {
        source_path_for(&self.slug, self.kind)
    }

    /// Derived image path relative to the collection root.
    pub fn output_path(&self) -> PathBuf {
        entity_dir(&self.slug, self.kind).join(derived_file_name(&self.slug, &self.size))
    }
}

/// `{slug}-hi-res.jpg`
pub fn source_file_name(slug: &str) -> String {
    format!("{slug}-{SOURCE_SUFFIX}.{IMAGE_EXTENSION}")
}

/// `{slug}-{size}.jpg`
pub fn derived_file_name(slug: &str, size: &str) -> String {
    format!("{slug}-{size}.{IMAGE_EXTENSION}")
}

/// `{kind}/{slug}`, relative to the collection root.
pub fn entity_dir(slug: &str, kind: EntityKind) -> PathBuf {
    Path::new(kind.as_str()).join(slug)
}

/// Canonical source image path for an entity, relative to the collection root.
///
/// ```
/// # use sleeve::naming::source_path_for;
/// # use sleeve::types::EntityKind;
/// # use std::path::Path;
/// assert_eq!(
///     source_path_for("foo", EntityKind::Album),
///     Path::new("album/foo/foo-hi-res.jpg")
/// );
/// ```
pub fn source_path_for(slug: &str, kind: EntityKind) -> PathBuf {
    entity_dir(slug, kind).join(source_file_name(slug))
}

/// URL path under which a derived image is served.
pub fn derived_request_path(kind: EntityKind, slug: &str, size: &str) -> String {
    format!("/{}/{}/{}", kind, slug, derived_file_name(slug, size))
}

/// Match a request path against `/{album|artist}/{slug}/{slug}-{size}.jpg`.
///
/// The query string is ignored and percent-encoding is decoded first.
/// Returns `None` for anything else: extra or missing segments, a file name
/// whose stem does not repeat the directory slug, the source image itself,
/// or a size token that is not plain ASCII alphanumerics. A `None` means
/// "not a derived image", never an error.
///
/// Whether the size token names a configured size class is left to the
/// caller; `/album/foo/foo-huge.jpg` parses.
pub fn parse_derived_request(request_path: &str) -> Option<DerivedRequest> {
    let path = normalize_request_path(request_path)?;
    let rest = path.strip_prefix('/')?;

    let mut segments = rest.split('/');
    let (kind, slug, file) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let kind = EntityKind::from_segment(kind)?;
    if slug.is_empty() || slug == "." || slug == ".." {
        return None;
    }

    let stem = file
        .strip_suffix(IMAGE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))?;
    let size = stem.strip_prefix(slug).and_then(|s| s.strip_prefix('-'))?;
    if size == SOURCE_SUFFIX || !is_size_token(size) {
        return None;
    }

    Some(DerivedRequest {
        kind,
        slug: slug.to_string(),
        size: size.to_string(),
    })
}

/// Recover the slug from a source image file name (`{slug}-hi-res.jpg`).
pub fn source_slug(file_name: &str) -> Option<&str> {
    let slug = file_name
        .strip_suffix(IMAGE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .and_then(|s| s.strip_suffix(SOURCE_SUFFIX))
        .and_then(|s| s.strip_suffix('-'))?;
    (!slug.is_empty()).then_some(slug)
}

/// Output path for every size name, next to the given source image.
///
/// Strips the source suffix from the file name and appends `-{size}.jpg`.
/// Returns `None` when `source` is not named like a source image.
pub fn expected_output_paths<'a>(
    source: &Path,
    sizes: impl IntoIterator<Item = &'a str>,
) -> Option<BTreeMap<String, PathBuf>> {
    let slug = source_slug(source.file_name()?.to_str()?)?;
    let dir = source.parent().unwrap_or(Path::new(""));
    Some(
        sizes
            .into_iter()
            .map(|size| (size.to_string(), dir.join(derived_file_name(slug, size))))
            .collect(),
    )
}

/// The size name a file is derived at, if its name follows `{anything}-{size}.jpg`
/// for one of `sizes`. Source images never match.
pub fn derived_size_of<'s>(
    file_name: &str,
    sizes: impl IntoIterator<Item = &'s str>,
) -> Option<&'s str> {
    if source_slug(file_name).is_some() {
        return None;
    }
    let stem = file_name
        .strip_suffix(IMAGE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))?;
    sizes.into_iter().find(|size| {
        stem.strip_suffix(*size)
            .and_then(|s| s.strip_suffix('-'))
            .is_some_and(|prefix| !prefix.is_empty())
    })
}

fn is_size_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Decode percent-escapes and drop query string / fragment.
fn normalize_request_path(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}
