//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Cover resize | `crop_imm` to the centered square, then `resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Decoding sniffs the format from the bytes, so a PNG saved under a `.jpg`
//! name still works. Output is always baseline RGB JPEG.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_cover_crop;
use super::params::DeriveParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Decode an in-memory image, guessing the format from its magic bytes.
fn decode(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Crop the centered square of `img` and scale it to `side`×`side`.
fn cover_fit(img: &DynamicImage, side: u32) -> Result<DynamicImage, BackendError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(BackendError::Decode("image has no pixels".into()));
    }
    let crop = calculate_cover_crop((width, height), side);
    let window = img.crop_imm(crop.x, crop.y, crop.window, crop.window);
    Ok(window.resize_exact(crop.side, crop.side, FilterType::Lanczos3))
}

/// Encode as RGB JPEG into a fresh buffer.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(buffer)
}

impl ImageBackend for RustBackend {
    fn derive(&self, source: &[u8], params: &DeriveParams) -> Result<Vec<u8>, BackendError> {
        let img = decode(source)?;
        let square = cover_fit(&img, params.dimension)?;
        // Quality is clamped to 1..=100 on construction.
        encode_jpeg(&square, params.quality.value() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::test_helpers::{jpeg_bytes, png_bytes};
    use image::ImageFormat;

    fn params(dimension: u32) -> DeriveParams {
        DeriveParams {
            dimension,
            quality: Quality::new(85),
        }
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn square_output_for_landscape_source() {
        let out = RustBackend::new().derive(&jpeg_bytes(300, 200), &params(128)).unwrap();
        assert_eq!(decoded_dimensions(&out), (128, 128));
    }

    #[test]
    fn square_output_for_portrait_source() {
        let out = RustBackend::new().derive(&jpeg_bytes(150, 400), &params(128)).unwrap();
        assert_eq!(decoded_dimensions(&out), (128, 128));
    }

    #[test]
    fn square_output_for_square_source() {
        let out = RustBackend::new().derive(&jpeg_bytes(256, 256), &params(100)).unwrap();
        assert_eq!(decoded_dimensions(&out), (100, 100));
    }

    #[test]
    fn upscales_small_sources_to_full_square() {
        let out = RustBackend::new().derive(&jpeg_bytes(40, 30), &params(96)).unwrap();
        assert_eq!(decoded_dimensions(&out), (96, 96));
    }

    #[test]
    fn output_is_jpeg_even_for_png_source() {
        let out = RustBackend::new().derive(&png_bytes(64, 48), &params(32)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        assert_eq!(decoded_dimensions(&out), (32, 32));
    }

    #[test]
    fn derive_is_deterministic() {
        let source = jpeg_bytes(320, 240);
        let backend = RustBackend::new();
        let a = backend.derive(&source, &params(120)).unwrap();
        let b = backend.derive(&source, &params(120)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quality_changes_output() {
        let source = jpeg_bytes(320, 240);
        let backend = RustBackend::new();
        let low = backend
            .derive(&source, &DeriveParams { dimension: 120, quality: Quality::new(20) })
            .unwrap();
        let high = backend.derive(&source, &params(120)).unwrap();
        assert_ne!(low, high);
    }

    #[test]
    fn extreme_aspect_source_stays_cheap() {
        let start = std::time::Instant::now();
        let out = RustBackend::new().derive(&png_bytes(20_000, 1), &params(800)).unwrap();
        assert_eq!(decoded_dimensions(&out), (800, 800));
        assert!(start.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn tall_strip_source_is_square() {
        let out = RustBackend::new().derive(&png_bytes(2, 3_000), &params(128)).unwrap();
        assert_eq!(decoded_dimensions(&out), (128, 128));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = RustBackend::new().derive(b"definitely not a jpeg", &params(64));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        let result = RustBackend::new().derive(&[], &params(64));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }
}
