//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the one narrow seam between the pipeline and
//! a codec: bytes in, JPEG bytes out. Path derivation, freshness checks and
//! both orchestrators only ever talk to this trait, so the codec can be
//! swapped (or mocked) without touching them.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::DeriveParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode JPEG: {0}")]
    Encode(String),
}

/// Trait for image processing backends.
///
/// Implementations must be deterministic: the same bytes and parameters
/// always produce the same output. The freshness contract of the batch
/// walker relies on it. They must not touch the filesystem.
pub trait ImageBackend: Send + Sync {
    /// Decode `source`, cover-fit it into a `dimension`×`dimension` square
    /// anchored at the center, and encode the result as JPEG.
    fn derive(&self, source: &[u8], params: &DeriveParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::Mutex;

    /// Source bytes that make [`MockBackend`] fail with a decode error.
    pub const CORRUPT: &[u8] = b"not an image";

    /// Mock backend that records operations without decoding anything.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedOp {
        pub source_len: usize,
        pub dimension: u32,
        pub quality: u32,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn derive(&self, source: &[u8], params: &DeriveParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp {
                source_len: source.len(),
                dimension: params.dimension,
                quality: params.quality.value(),
            });
            if source == CORRUPT {
                return Err(BackendError::Decode("mock corrupt source".into()));
            }
            Ok(format!("{}:{}", params.dimension, params.quality.value()).into_bytes())
        }
    }

    #[test]
    fn mock_records_derive() {
        let backend = MockBackend::new();
        let out = backend
            .derive(
                b"jpeg",
                &DeriveParams {
                    dimension: 800,
                    quality: Quality::new(85),
                },
            )
            .unwrap();

        assert_eq!(out, b"800:85");
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp {
                source_len: 4,
                dimension: 800,
                quality: 85,
            }]
        );
    }

    #[test]
    fn mock_fails_on_corrupt_marker() {
        let backend = MockBackend::new();
        let result = backend.derive(
            CORRUPT,
            &DeriveParams {
                dimension: 128,
                quality: Quality::default(),
            },
        );
        assert!(matches!(result, Err(BackendError::Decode(_))));
        assert_eq!(backend.get_operations().len(), 1);
    }
}
