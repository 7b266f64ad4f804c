//! On-demand derivation: request path in, JPEG bytes (or a failure) out.
//!
//! Per request:
//!
//! 1. Not a derived-image path → [`Handled::PassThrough`].
//! 2. Source image missing → [`DeriveFailure::SourceNotFound`] (404).
//! 3. Size name not in the policy → [`DeriveFailure::UnknownSizeName`] (400).
//! 4. Read and resize in memory. Read or decode errors → 500.
//!
//! Nothing is written to disk and nothing is cached between requests, so two
//! concurrent requests for the same image do the same work twice.

use crate::imaging::{BackendError, ImageBackend};
use crate::naming::{DerivedRequest, parse_derived_request};
use crate::sizes::SizePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Cache policy advertised on derived responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Source edits show up on the next reload.
    #[default]
    Development,
    /// Derived URLs are treated as immutable.
    Production,
}

impl CacheMode {
    pub fn cache_control(self) -> &'static str {
        match self {
            CacheMode::Development => "no-store",
            CacheMode::Production => "public, max-age=31536000, immutable",
        }
    }
}

/// Why a derived-image request could not be answered with an image.
#[derive(Error, Debug)]
pub enum DeriveFailure {
    #[error("source image not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("unknown size name: {0}")]
    UnknownSizeName(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Decode(#[from] BackendError),
}

impl DeriveFailure {
    /// HTTP status for this failure.
    pub fn status(&self) -> u16 {
        match self {
            DeriveFailure::SourceNotFound(_) => 404,
            DeriveFailure::UnknownSizeName(_) => 400,
            DeriveFailure::Read { .. } | DeriveFailure::Decode(_) => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedImage {
    pub body: Vec<u8>,
    pub cache_control: &'static str,
}

#[derive(Debug)]
pub enum Handled {
    /// Not a derived-image request; someone else answers it.
    PassThrough,
    Derived(Result<DerivedImage, DeriveFailure>),
}

/// Derives images for requests under one collection root.
pub struct Middleware<B> {
    root: PathBuf,
    policy: SizePolicy,
    cache: CacheMode,
    backend: B,
}

impl<B: ImageBackend> Middleware<B> {
    pub fn new(root: impl Into<PathBuf>, policy: SizePolicy, cache: CacheMode, backend: B) -> Self {
        Self {
            root: root.into(),
            policy,
            cache,
            backend,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn handle(&self, request_path: &str) -> Handled {
        match parse_derived_request(request_path) {
            Some(request) => Handled::Derived(self.derive(&request)),
            None => Handled::PassThrough,
        }
    }

    pub fn derive(&self, request: &DerivedRequest) -> Result<DerivedImage, DeriveFailure> {
        let source = self.root.join(request.source_path());
        if !source.is_file() {
            return Err(DeriveFailure::SourceNotFound(source));
        }

        let class = self
            .policy
            .get(&request.size)
            .ok_or_else(|| DeriveFailure::UnknownSizeName(request.size.clone()))?;

        let bytes = fs::read(&source).map_err(|e| DeriveFailure::Read {
            path: source.clone(),
            source: e,
        })?;
        let body = self.backend.derive(&bytes, &class.params())?;
        debug!(
            source = %source.display(),
            size = %class.name,
            bytes = body.len(),
            "derived"
        );

        Ok(DerivedImage {
            body,
            cache_control: self.cache.cache_control(),
        })
    }
}
