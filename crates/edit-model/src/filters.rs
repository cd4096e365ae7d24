//! Color filter settings.
//!
//! Percent values where 100 is the identity for brightness, contrast, and
//! saturation; grayscale blends from 0 (untouched) to 100 (fully
//! desaturated).

use serde::{Deserialize, Serialize};

/// Color filter parameters applied to every exported and previewed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Brightness scale, `[0, 200]`.
    pub brightness: f64,
    /// Contrast scale about mid-gray, `[0, 200]`.
    pub contrast: f64,
    /// Saturation scale about per-pixel luma, `[0, 200]`.
    pub saturation: f64,
    /// Blend toward luma, `[0, 100]`.
    pub grayscale: f64,
}

impl FilterSettings {
    /// Settings that leave every pixel untouched.
    pub const IDENTITY: FilterSettings = FilterSettings {
        brightness: 100.0,
        contrast: 100.0,
        saturation: 100.0,
        grayscale: 0.0,
    };

    /// Create settings, clamping each value to its valid range.
    pub fn new(brightness: f64, contrast: f64, saturation: f64, grayscale: f64) -> Self {
        Self {
            brightness: brightness.clamp(0.0, 200.0),
            contrast: contrast.clamp(0.0, 200.0),
            saturation: saturation.clamp(0.0, 200.0),
            grayscale: grayscale.clamp(0.0, 100.0),
        }
    }

    /// Whether these settings change any pixel.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self::IDENTITY
    }
}
