//! # Sleeve
//!
//! Cover-art derivatives for a static record collection site. Each album and
//! artist directory holds one high-resolution source image; the site asks for
//! square resized copies by name (`medium`, `small`, `avatar`). Sleeve
//! produces them two ways from the same size policy:
//!
//! ```text
//! serve   GET /album/foo/foo-medium.jpg  →  resize in memory, respond   (development)
//! derive  public/album/foo/              →  write foo-{size}.jpg        (build)
//! clean   public/album/foo/              →  delete foo-{size}.jpg       (housekeeping)
//! ```
//!
//! Because deriving is deterministic, both modes produce the same bytes for
//! the same source, so a site can switch between them freely.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Path deriver: request path ↔ source path ↔ output paths (pure) |
//! | [`sizes`] | Size policy: named square dimensions and JPEG quality |
//! | [`imaging`] | Resizer: decode, cover-fit, encode JPEG behind the [`imaging::ImageBackend`] trait |
//! | [`freshness`] | Mtime comparison deciding whether batch outputs are stale |
//! | [`scan`] | Enumerates `{root}/{album,artist}/{slug}/` entities |
//! | [`batch`] | Batch walker: parallel derive with per-entity outcomes and a summary |
//! | [`clean`] | Deletes derived images, with dry run |
//! | [`serve`] | On-demand middleware plus a small tiny_http server around it |
//! | [`config`] | `sleeve.toml` loading, merging and validation |
//! | [`types`] | Shared types (`EntityKind`) |
//! | [`output`] | CLI output formatting |
//!
//! # Collection Layout
//!
//! ```text
//! public/
//! ├── album/
//! │   └── kind-of-blue-1959/
//! │       ├── kind-of-blue-1959-hi-res.jpg    # source, never written
//! │       ├── kind-of-blue-1959-medium.jpg    # derived
//! │       └── kind-of-blue-1959.json          # metadata, ignored
//! └── artist/
//!     └── miles-davis/
//!         └── miles-davis-hi-res.jpg
//! ```
//!
//! # Design Decisions
//!
//! ## One Narrow Imaging Seam
//!
//! Everything that touches pixels goes through
//! [`imaging::ImageBackend::derive`]: bytes and a size in, JPEG bytes out.
//! Path derivation, freshness and both orchestrators never see the codec,
//! and the tests swap in a mock that records calls.
//!
//! ## Results, Not Counters
//!
//! The batch walker returns a [`batch::BatchSummary`] listing every entity's
//! outcome. Progress lines are sent over a channel to a printer thread, so
//! parallel workers never share mutable state.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling and JPEG encoding all come from the `image`
//! crate. No system libraries, no external processes.

pub mod batch;
pub mod clean;
pub mod config;
pub mod freshness;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod scan;
pub mod serve;
pub mod sizes;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
