//! Pure calculation functions for cover-fit geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Crop-then-resize plan that turns any source into a `side`×`side` square.
///
/// The window is the largest centered square of the source, so the
/// intermediate image is never larger than the source itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverCrop {
    /// Top-left corner of the square window inside the source.
    pub x: u32,
    pub y: u32,
    /// Edge of the square window, in source pixels.
    pub window: u32,
    /// Edge of the output square.
    pub side: u32,
}

/// Plan a centered cover crop of `source` into a square of `side` pixels.
///
/// Overflow on the long axis is split evenly; an odd remainder pixel goes to
/// the right/bottom edge.
pub fn calculate_cover_crop(source: (u32, u32), side: u32) -> CoverCrop {
    let (width, height) = source;
    let window = width.min(height);
    CoverCrop {
        x: (width - window) / 2,
        y: (height - window) / 2,
        window,
        side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_source_uses_whole_image() {
        let crop = calculate_cover_crop((2000, 2000), 800);
        assert_eq!((crop.x, crop.y, crop.window, crop.side), (0, 0, 2000, 800));
    }

    #[test]
    fn landscape_crops_horizontally_centered() {
        // 3000x2000 → 2000 window starting 500px in
        let crop = calculate_cover_crop((3000, 2000), 800);
        assert_eq!((crop.x, crop.y, crop.window), (500, 0, 2000));
    }

    #[test]
    fn portrait_crops_vertically_centered() {
        let crop = calculate_cover_crop((1000, 1500), 400);
        assert_eq!((crop.x, crop.y, crop.window), (0, 250, 1000));
    }

    #[test]
    fn small_source_window_is_upscaled_later() {
        let crop = calculate_cover_crop((100, 50), 128);
        assert_eq!((crop.x, crop.y, crop.window, crop.side), (25, 0, 50, 128));
    }

    #[test]
    fn odd_overflow_rounds_down() {
        // 129x128: 1px overflow, window starts at 0
        let crop = calculate_cover_crop((129, 128), 128);
        assert_eq!((crop.x, crop.window), (0, 128));
    }

    #[test]
    fn extreme_banner_window_is_bounded_by_source() {
        let crop = calculate_cover_crop((20_000, 1), 800);
        assert_eq!((crop.x, crop.y, crop.window), (9_999, 0, 1));
    }
}
