//! Configuration loading and validation.
//!
//! One optional `sleeve.toml` in the working directory. Stock defaults are
//! serialized to a TOML value, the user file is deep-merged on top, and the
//! result is deserialized with unknown keys rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! root = "public"           # Collection root (album/ and artist/ live here)
//!
//! [[sizes]]                 # Size policy; a [[sizes]] list replaces the whole table
//! name = "medium"
//! dimension = 800
//! quality = 85
//!
//! [[sizes]]
//! name = "small"
//! dimension = 400
//!
//! [[sizes]]
//! name = "avatar"
//! dimension = 128
//!
//! [serve]
//! interface = "127.0.0.1"
//! port = 5180
//! cache = "development"     # or "production"
//! static_files = true       # serve non-derived requests from root
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::serve::CacheMode;
use crate::sizes::{PolicyError, SizeClass, SizePolicy, standard_classes};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sleeve.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid size policy: {0}")]
    Policy(#[from] PolicyError),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `sleeve.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Collection root directory.
    pub root: PathBuf,
    /// Named output sizes shared by serve, derive and clean.
    pub sizes: Vec<SizeClass>,
    pub serve: ServeConfig,
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            sizes: standard_classes(),
            serve: ServeConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy()?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The validated size policy.
    pub fn policy(&self) -> Result<SizePolicy, PolicyError> {
        SizePolicy::new(self.sizes.clone())
    }
}

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub interface: IpAddr,
    pub port: u16,
    pub cache: CacheMode,
    /// Serve requests the derivation middleware passes through as static
    /// files from the collection root.
    pub static_files: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5180,
            cache: CacheMode::Development,
            static_files: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers, for both the batch walker and the
    /// server's request pool. When absent, defaults to the number of CPU
    /// cores. Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely. A `[[sizes]]`
///   list therefore replaces the stock size table rather than extending it.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Load config from a path the user named explicitly; a missing file is an
/// error rather than a silent fallback.
pub fn load_required_config(path: &Path) -> Result<Config, ConfigError> {
    match load_raw_config(path)? {
        Some(value) => resolve_config(Some(value)),
        None => Err(ConfigError::NotFound(path.to_path_buf())),
    }
}

/// Returns a fully-commented stock `sleeve.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Sleeve Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Collection root. Entities live at {root}/album/{slug}/ and
# {root}/artist/{slug}/, each with a {slug}-hi-res.jpg source image.
root = "public"

# ---------------------------------------------------------------------------
# Size policy
# ---------------------------------------------------------------------------
# Every derived image is a square of `dimension` pixels, cover-fitted and
# center-cropped from the source, encoded as JPEG at `quality` (1-100,
# default 85). Names must be ASCII letters and digits; they appear in file
# names as {slug}-{name}.jpg.
#
# Declaring any [[sizes]] entry replaces this whole table.

[[sizes]]
name = "medium"
dimension = 800
quality = 85

[[sizes]]
name = "small"
dimension = 400
quality = 85

[[sizes]]
name = "avatar"
dimension = 128
quality = 85

# ---------------------------------------------------------------------------
# Development server (`sleeve serve`)
# ---------------------------------------------------------------------------
[serve]
interface = "127.0.0.1"
port = 5180

# Cache-Control on derived images:
#   "development" -> no-store (source edits show up on reload)
#   "production"  -> public, max-age=31536000, immutable
cache = "development"

# Serve everything that is not a derived image straight from the root
# (the site itself, source images, JSON metadata).
static_files = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `derive` and for `serve` request handling.
# Omit to use all CPU cores. Values above the core count are clamped down.
# max_processes = 4
"##
}
