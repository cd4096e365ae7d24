//! Crop rectangle type for frame framing.
//!
//! All coordinates are percentages of the source frame dimensions, so a
//! crop survives resolution changes between preview and export.

use serde::{Deserialize, Serialize};

/// Minimum crop dimension in percent.
pub const MIN_CROP_SIZE: f64 = 10.0;

/// A rectangular crop within the source frame.
///
/// Percent coordinates: `(0, 0)` is the top-left corner of the source,
/// `width`/`height` are the kept fraction of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge (percent of source width).
    pub x: f64,
    /// Top edge (percent of source height).
    pub y: f64,
    /// Kept width (percent of source width).
    pub width: f64,
    /// Kept height (percent of source height).
    pub height: f64,
}

impl CropRect {
    /// Full-frame crop (no-op).
    pub const FULL: CropRect = CropRect {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
    };

    /// Create a new crop, clamping values to valid range.
    ///
    /// Sizes clamp to `[MIN_CROP_SIZE, 100]` first, then positions clamp so
    /// the rectangle stays inside the frame (`x + width <= 100`,
    /// `y + height <= 100`).
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let width = width.clamp(MIN_CROP_SIZE, 100.0);
        let height = height.clamp(MIN_CROP_SIZE, 100.0);
        Self {
            x: x.clamp(0.0, 100.0 - width),
            y: y.clamp(0.0, 100.0 - height),
            width,
            height,
        }
    }

    /// Whether this crop keeps the whole frame.
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// The source sub-rectangle in pixels for a `width x height` frame.
    pub fn source_region(&self, frame_width: u32, frame_height: u32) -> SourceRegion {
        SourceRegion {
            x: frame_width as f64 * self.x / 100.0,
            y: frame_height as f64 * self.y / 100.0,
            width: frame_width as f64 * self.width / 100.0,
            height: frame_height as f64 * self.height / 100.0,
        }
    }

    /// Output dimensions in pixels for a `width x height` source frame.
    ///
    /// Rounded to the nearest pixel, never below one.
    pub fn output_size(&self, frame_width: u32, frame_height: u32) -> (u32, u32) {
        let w = (frame_width as f64 * self.width / 100.0).round() as u32;
        let h = (frame_height as f64 * self.height / 100.0).round() as u32;
        (w.max(1), h.max(1))
    }

    /// Geometric magnification the preview applies to compensate the clip
    /// (`100 / width`).
    pub fn preview_scale(&self) -> f64 {
        100.0 / self.width
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// A crop's sub-rectangle in source pixels (fractional, pre-resample).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceRegion {
    /// Right edge in source pixels.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge in source pixels.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}
