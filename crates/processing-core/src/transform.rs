//! The per-frame crop + color transform.
//!
//! One `FrameTransform` is planned per export from the parameter snapshot
//! and applied to every sampled frame. Preview rendering expresses the same
//! four color stages in the same order, so what the encoder sees matches
//! what the monitor showed.

use recut_edit_model::{CropRect, EditParams, FilterSettings};

use crate::frame::FrameBuffer;

const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// Rec.709 luma of linear-range channel values.
#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// The four color stages collapsed into one per-pixel pass.
///
/// Stage order is fixed: brightness, contrast, saturation, grayscale.
/// Channel math runs in f32 over `[0, 1]`, clamped after each stage, and
/// rounds back to u8 once at the end. Alpha passes through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPipeline {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    grayscale: f32,
}

impl ColorPipeline {
    pub fn new(filters: &FilterSettings) -> Self {
        Self {
            brightness: (filters.brightness / 100.0) as f32,
            contrast: (filters.contrast / 100.0) as f32,
            saturation: (filters.saturation / 100.0) as f32,
            grayscale: (filters.grayscale / 100.0) as f32,
        }
    }

    /// Whether this pipeline leaves pixels untouched.
    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0
            && self.contrast == 1.0
            && self.saturation == 1.0
            && self.grayscale == 0.0
    }

    /// Apply all four stages to one RGBA pixel.
    #[inline]
    pub fn apply(&self, rgba: [u8; 4]) -> [u8; 4] {
        let mut r = rgba[0] as f32 / 255.0;
        let mut g = rgba[1] as f32 / 255.0;
        let mut b = rgba[2] as f32 / 255.0;

        r = (r * self.brightness).clamp(0.0, 1.0);
        g = (g * self.brightness).clamp(0.0, 1.0);
        b = (b * self.brightness).clamp(0.0, 1.0);

        r = ((r - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0);
        g = ((g - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0);
        b = ((b - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0);

        let l = luma(r, g, b);
        r = (l + (r - l) * self.saturation).clamp(0.0, 1.0);
        g = (l + (g - l) * self.saturation).clamp(0.0, 1.0);
        b = (l + (b - l) * self.saturation).clamp(0.0, 1.0);

        let l = luma(r, g, b);
        r += (l - r) * self.grayscale;
        g += (l - g) * self.grayscale;
        b += (l - b) * self.grayscale;

        [
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            rgba[3],
        ]
    }
}

/// Planned crop + resample + color transform for one source geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTransform {
    region_x: f64,
    region_y: f64,
    step_x: f64,
    step_y: f64,
    source_width: u32,
    source_height: u32,
    out_width: u32,
    out_height: u32,
    color: ColorPipeline,
}

impl FrameTransform {
    /// Plan the transform for `source_width x source_height` frames.
    pub fn new(source_width: u32, source_height: u32, params: &EditParams) -> Self {
        Self::with_crop(source_width, source_height, &params.crop, &params.filters)
    }

    pub fn with_crop(
        source_width: u32,
        source_height: u32,
        crop: &CropRect,
        filters: &FilterSettings,
    ) -> Self {
        let region = crop.source_region(source_width, source_height);
        let (out_width, out_height) = crop.output_size(source_width, source_height);

        tracing::debug!(
            source_width,
            source_height,
            out_width,
            out_height,
            "Planned frame transform"
        );

        Self {
            region_x: region.x,
            region_y: region.y,
            step_x: region.width / out_width as f64,
            step_y: region.height / out_height as f64,
            source_width,
            source_height,
            out_width,
            out_height,
            color: ColorPipeline::new(filters),
        }
    }

    /// Output dimensions every transformed frame will have.
    pub fn output_size(&self) -> (u32, u32) {
        (self.out_width, self.out_height)
    }

    pub fn output_width(&self) -> u32 {
        self.out_width
    }

    pub fn output_height(&self) -> u32 {
        self.out_height
    }

    /// Allocate a destination buffer matching [`Self::output_size`].
    pub fn allocate_output(&self) -> FrameBuffer {
        FrameBuffer::new(self.out_width, self.out_height)
    }

    /// Transform `source` into `dest`.
    ///
    /// Nearest-neighbor sampling at output pixel centers, clamped to the
    /// source bounds, then the color pipeline per pixel. `dest` is resized
    /// when its dimensions do not match the plan.
    pub fn apply(&self, source: &FrameBuffer, dest: &mut FrameBuffer) {
        if dest.width() != self.out_width || dest.height() != self.out_height {
            *dest = self.allocate_output();
        }

        let max_x = source.width().saturating_sub(1);
        let max_y = source.height().saturating_sub(1);

        for oy in 0..self.out_height {
            let sy = (self.region_y + (oy as f64 + 0.5) * self.step_y) as u32;
            let sy = sy.min(max_y);
            for ox in 0..self.out_width {
                let sx = (self.region_x + (ox as f64 + 0.5) * self.step_x) as u32;
                let sx = sx.min(max_x);
                dest.set_pixel(ox, oy, self.color.apply(source.pixel(sx, sy)));
            }
        }
    }

    /// Allocating convenience over [`Self::apply`].
    pub fn transform(&self, source: &FrameBuffer) -> FrameBuffer {
        let mut dest = self.allocate_output();
        self.apply(source, &mut dest);
        dest
    }
}
