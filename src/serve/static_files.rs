//! Static pass-through: URL to file under the collection root.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Resolve a URL to a file under `root`, using `index.html` for directories.
///
/// Rejects anything that escapes `root`, including through symlinks.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = root.join(&clean).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Decode, strip query string and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

/// Content type from file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
