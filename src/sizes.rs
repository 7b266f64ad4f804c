//! The size policy: named output sizes shared by every derivation mode.
//!
//! One [`SizePolicy`] is built from configuration at startup and handed to
//! the server, the batch walker and the cleanup pass, so a derived image has
//! the same dimensions and quality no matter which mode produced it.
//!
//! ```text
//! medium  800×800  q85
//! small   400×400  q85
//! avatar  128×128  q85
//! ```

use crate::imaging::{DeriveParams, Quality};
use crate::naming::SOURCE_SUFFIX;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// JPEG quality used by the stock size classes.
pub const DEFAULT_QUALITY: u32 = 85;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("at least one size class is required")]
    Empty,
    #[error("size name {0:?} is defined more than once")]
    DuplicateName(String),
    #[error("size name {0:?} must be non-empty ASCII letters and digits")]
    InvalidName(String),
    /// `{slug}-{name}.jpg` would read as the source image of another slug.
    #[error("size name {0:?} collides with the -hi-res source suffix")]
    ReservedName(String),
    #[error("size {0:?} must have a non-zero dimension")]
    ZeroDimension(String),
    #[error("size {name:?} has quality {quality}, expected 1-100")]
    QualityOutOfRange { name: String, quality: u32 },
}

/// One named output size: a square of `dimension` pixels at `quality`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeClass {
    pub name: String,
    pub dimension: u32,
    #[serde(default = "default_quality")]
    pub quality: u32,
}

fn default_quality() -> u32 {
    DEFAULT_QUALITY
}

impl SizeClass {
    pub fn new(name: &str, dimension: u32) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Resizer parameters for this size.
    pub fn params(&self) -> DeriveParams {
        DeriveParams {
            dimension: self.dimension,
            quality: Quality::new(self.quality),
        }
    }
}

/// Validated, ordered table of size classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizePolicy {
    classes: Vec<SizeClass>,
}

impl SizePolicy {
    /// Validate and wrap a size table. Order is preserved.
    pub fn new(classes: Vec<SizeClass>) -> Result<Self, PolicyError> {
        if classes.is_empty() {
            return Err(PolicyError::Empty);
        }
        let mut seen = HashSet::new();
        for class in &classes {
            let name = &class.name;
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(PolicyError::InvalidName(name.clone()));
            }
            if is_source_suffix_tail(name) {
                return Err(PolicyError::ReservedName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(PolicyError::DuplicateName(name.clone()));
            }
            if class.dimension == 0 {
                return Err(PolicyError::ZeroDimension(name.clone()));
            }
            if !(1..=100).contains(&class.quality) {
                return Err(PolicyError::QualityOutOfRange {
                    name: name.clone(),
                    quality: class.quality,
                });
            }
        }
        Ok(Self { classes })
    }

    /// The stock table: medium 800, small 400, avatar 128, all at quality 85.
    pub fn standard() -> Self {
        Self {
            classes: standard_classes(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SizeClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn classes(&self) -> &[SizeClass] {
        &self.classes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.name.as_str())
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// True when `name` is a `-`-delimited tail of the source suffix (`res` for
/// `hi-res`).
fn is_source_suffix_tail(name: &str) -> bool {
    SOURCE_SUFFIX == name
        || SOURCE_SUFFIX
            .strip_suffix(name)
            .is_some_and(|head| head.ends_with('-'))
}

/// The stock size classes, in policy order.
pub fn standard_classes() -> Vec<SizeClass> {
    vec![
        SizeClass::new("medium", 800),
        SizeClass::new("small", 400),
        SizeClass::new("avatar", 128),
    ]
}
