//! Property tests for the frame transform and gain stage.

use proptest::prelude::*;
use recut_edit_model::{CropRect, FilterSettings};
use recut_processing_core::{apply_gain, FrameBuffer, FrameTransform};

proptest! {
    #[test]
    fn prop_output_dims_match_crop(
        w in 2u32..128,
        h in 2u32..128,
        x in -20.0..120.0f64,
        y in -20.0..120.0f64,
        cw in -20.0..120.0f64,
        ch in -20.0..120.0f64,
    ) {
        let crop = CropRect::new(x, y, cw, ch);
        let transform = FrameTransform::with_crop(w, h, &crop, &FilterSettings::IDENTITY);
        prop_assert_eq!(transform.output_size(), crop.output_size(w, h));

        // Sampling an actual frame exercises the bounds clamping; any
        // escape would index out of the source buffer.
        let source = FrameBuffer::solid(w, h, [1, 2, 3, 255]);
        let out = transform.transform(&source);
        prop_assert_eq!(out.width(), crop.output_size(w, h).0);
        prop_assert_eq!(out.height(), crop.output_size(w, h).1);
    }

    #[test]
    fn prop_identity_params_pass_frames_through(
        data in prop::collection::vec(any::<u8>(), 8 * 8 * 4),
    ) {
        let source = FrameBuffer::from_rgba(8, 8, data).unwrap();
        let transform =
            FrameTransform::with_crop(8, 8, &CropRect::FULL, &FilterSettings::IDENTITY);
        prop_assert_eq!(transform.transform(&source), source);
    }

    #[test]
    fn prop_transform_is_deterministic(
        data in prop::collection::vec(any::<u8>(), 16 * 12 * 4),
        brightness in 0.0..200.0f64,
        contrast in 0.0..200.0f64,
        saturation in 0.0..200.0f64,
        grayscale in 0.0..100.0f64,
        x in 0.0..90.0f64,
        y in 0.0..90.0f64,
        cw in 10.0..100.0f64,
        ch in 10.0..100.0f64,
    ) {
        let source = FrameBuffer::from_rgba(16, 12, data).unwrap();
        let crop = CropRect::new(x, y, cw, ch);
        let filters = FilterSettings::new(brightness, contrast, saturation, grayscale);
        let transform = FrameTransform::with_crop(16, 12, &crop, &filters);
        prop_assert_eq!(transform.transform(&source), transform.transform(&source));
    }

    #[test]
    fn prop_gain_scales_without_resampling(
        samples in prop::collection::vec(-1.0..1.0f32, 0..512),
        volume in 0.0..1.0f32,
    ) {
        let mut scaled = samples.clone();
        apply_gain(&mut scaled, volume);
        prop_assert_eq!(scaled.len(), samples.len());
        for (before, after) in samples.iter().zip(scaled.iter()) {
            prop_assert!((before * volume - after).abs() < 1e-6);
        }
    }
}
