//! Mtime-based freshness detection for derived images.
//!
//! Used by the batch walker to skip entities whose derived files are already
//! at least as new as their source image. The check is advisory: a wrong
//! answer costs a redundant re-encode, never wrong content, because deriving
//! is deterministic.
//!
//! Both sides are files this tool either reads or writes on the same machine,
//! so modification times are trustworthy enough; copied or checked-out trees
//! simply regenerate once.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if every output exists and is not older than the source.
///
/// Returns `false` (regenerate) when the source is missing, when any output
/// is missing, or when any output predates the source. Equal timestamps
/// count as fresh.
pub fn is_up_to_date<P: AsRef<Path>>(source: &Path, outputs: &[P]) -> bool {
    let Some(source_time) = get_mtime(source) else {
        return false;
    };

    outputs.iter().all(|output| {
        get_mtime(output.as_ref()).is_some_and(|output_time| output_time >= source_time)
    })
}
