//! CLI output formatting.
//!
//! Every command's human-facing output is built here as plain lines by a
//! `format_*` function (unit testable, no I/O) and printed by a thin
//! `print_*` wrapper. Diagnostics go through `tracing` instead and never
//! mix with these lines.
//!
//! # Output Format
//!
//! ## Derive
//!
//! ```text
//! Deriving 3 entities
//! album/kind-of-blue-1959: generated
//!     medium, small, avatar
//! album/a-love-supreme-1965: no source image
//! artist/miles-davis: failed
//!     medium: Failed to decode image: ...
//! 1 generated, 0 up to date, 1 missing source, 1 failed (3 total)
//! ```
//!
//! ## Clean
//!
//! ```text
//! album/x/x-medium.jpg            # listed with --verbose
//! album/x/x-small.jpg
//! would delete 2 derived images
//! ```
//!
//! ## Check
//!
//! ```text
//! Sizes
//!     medium 800px q85
//!     avatar 128px q85
//! Entities
//!     album: 12 (1 missing source)
//!     artist: 4
//! Missing source images
//!     album/a-love-supreme-1965/a-love-supreme-1965-hi-res.jpg
//! ```

use crate::batch::{BatchEvent, BatchSummary};
use crate::clean::CleanSummary;
use crate::scan::Entity;
use crate::sizes::SizePolicy;
use crate::types::EntityKind;
use std::path::Path;

/// Show `path` relative to `root` when it lives there.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn indent(line: impl AsRef<str>) -> String {
    format!("    {}", line.as_ref())
}

// ============================================================================
// Derive
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { entities } => {
            let noun = if *entities == 1 { "entity" } else { "entities" };
            vec![format!("Deriving {} {}", entities, noun)]
        }
        BatchEvent::EntityFinished {
            kind,
            slug,
            status,
            detail,
        } => {
            let mut lines = vec![format!("{}/{}: {}", kind, slug, status.label())];
            if !detail.is_empty() {
                lines.push(indent(detail.join(", ")));
            }
            lines
        }
    }
}

/// Format the end-of-run summary: the counts line, then each failure.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![summary.to_string()];
    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        lines.push("Failures".to_string());
        for (report, error) in failures {
            lines.push(indent(format!("{}/{}: {}", report.kind, report.slug, error)));
        }
    }
    lines
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Clean
// ============================================================================

/// Format a cleanup result. Individual files are listed only when `verbose`;
/// errors are always listed.
pub fn format_clean_summary(summary: &CleanSummary, root: &Path, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if verbose {
        lines.extend(summary.removed.iter().map(|p| display_path(p, root)));
    }
    for error in &summary.errors {
        lines.push(format!(
            "error: {}: {}",
            display_path(&error.path, root),
            error.source
        ));
    }
    lines.push(summary.to_string());
    lines
}

pub fn print_clean_summary(summary: &CleanSummary, root: &Path, verbose: bool) {
    for line in format_clean_summary(summary, root, verbose) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the collection report for `check`: size table, per-kind counts and
/// entities without a source image.
pub fn format_check_report(entities: &[Entity], root: &Path, policy: &SizePolicy) -> Vec<String> {
    let mut lines = vec!["Sizes".to_string()];
    for class in policy.classes() {
        lines.push(indent(format!(
            "{} {}px q{}",
            class.name, class.dimension, class.quality
        )));
    }

    lines.push("Entities".to_string());
    for kind in EntityKind::ALL {
        let of_kind: Vec<_> = entities.iter().filter(|e| e.kind == kind).collect();
        let missing = of_kind.iter().filter(|e| e.source.is_none()).count();
        if missing > 0 {
            lines.push(indent(format!(
                "{}: {} ({} missing source)",
                kind,
                of_kind.len(),
                missing
            )));
        } else {
            lines.push(indent(format!("{}: {}", kind, of_kind.len())));
        }
    }

    let missing: Vec<_> = entities.iter().filter(|e| e.source.is_none()).collect();
    if !missing.is_empty() {
        lines.push("Missing source images".to_string());
        for entity in missing {
            lines.push(indent(display_path(&entity.expected_source(root), root)));
        }
    }
    lines
}

pub fn print_check_report(entities: &[Entity], root: &Path, policy: &SizePolicy) {
    for line in format_check_report(entities, root, policy) {
        println!("{}", line);
    }
}
