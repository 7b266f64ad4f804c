//! Parameter types for the resize operation.
//!
//! These describe *what* to produce, not *how*. They are the interface
//! between the callers that decide which sizes to derive (server, batch
//! walker) and the [`backend`](super::backend) that does the pixel work.

/// JPEG encoding quality (1-100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Square cover-fit at `dimension` pixels, encoded at `quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveParams {
    pub dimension: u32,
    pub quality: Quality,
}
