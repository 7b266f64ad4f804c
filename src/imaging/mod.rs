//! Image processing: decode, cover-fit, encode. Pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from bytes) |
//! | **Cover fit** | Lanczos3 resize to fill + centered crop |
//! | **Encode** | `JpegEncoder` at the size class quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for cover-fit geometry (unit testable)
//! - **Parameters**: [`DeriveParams`] and [`Quality`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//!
//! Nothing here touches the filesystem; callers read source bytes and write
//! (or serve) the result.

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use params::{DeriveParams, Quality};
pub use rust_backend::RustBackend;
