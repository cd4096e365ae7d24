//! Edit parameters: the UI-owned mutable state and its per-export snapshot.
//!
//! `EditState` is what parameter widgets mutate; every setter clamps so the
//! state is always within range. `EditParams` is the immutable deep copy an
//! export job captures at start, so mid-export edits only affect the next
//! job.

use serde::{Deserialize, Serialize};

use crate::crop::CropRect;
use crate::filters::FilterSettings;
use crate::media::MediaInfo;

/// Slowest allowed monitoring playback rate.
pub const MIN_PLAYBACK_SPEED: f64 = 0.25;

/// Fastest allowed monitoring playback rate.
pub const MAX_PLAYBACK_SPEED: f64 = 2.0;

/// Immutable parameter snapshot for one export job.
///
/// `playback_speed` rides along for completeness but never changes export
/// sampling cadence; it only drives monitoring playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditParams {
    /// Trim window start in seconds.
    pub trim_start: f64,
    /// Trim window end in seconds (exclusive).
    pub trim_end: f64,
    /// Crop rectangle in percent of source dimensions.
    pub crop: CropRect,
    /// Color filter settings.
    pub filters: FilterSettings,
    /// Monitoring playback rate.
    pub playback_speed: f64,
    /// Linear audio gain, `[0, 1]`.
    pub volume: f64,
}

impl EditParams {
    /// Length of the trim window in seconds.
    pub fn trim_window_secs(&self) -> f64 {
        self.trim_end - self.trim_start
    }
}

/// The live, UI-owned edit state.
///
/// Duration tracks the current source; intake resets the trim window to the
/// full source, discarding keeps every visual parameter and clears only the
/// source-derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditState {
    /// Duration of the current source in seconds, 0 when no source is set.
    pub duration: f64,
    pub trim_start: f64,
    pub trim_end: f64,
    pub crop: CropRect,
    pub filters: FilterSettings,
    pub playback_speed: f64,
    pub volume: f64,
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            duration: 0.0,
            trim_start: 0.0,
            trim_end: 0.0,
            crop: CropRect::FULL,
            filters: FilterSettings::IDENTITY,
            playback_speed: 1.0,
            volume: 1.0,
        }
    }
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly probed source duration and reset the trim window to
    /// cover the whole source.
    pub fn set_source_duration(&mut self, duration_secs: f64) {
        self.duration = duration_secs.max(0.0);
        self.trim_start = 0.0;
        self.trim_end = self.duration;
    }

    /// Set the trim window, clamping both ends into `[0, duration]`.
    ///
    /// An inverted window is representable here (slider handles cross
    /// transiently); it is rejected when a snapshot is taken.
    pub fn set_trim(&mut self, start_secs: f64, end_secs: f64) {
        let limit = if self.duration > 0.0 {
            self.duration
        } else {
            f64::MAX
        };
        self.trim_start = start_secs.clamp(0.0, limit);
        self.trim_end = end_secs.clamp(0.0, limit);
    }

    /// Replace the crop rectangle (re-clamped).
    pub fn set_crop(&mut self, crop: CropRect) {
        self.crop = CropRect::new(crop.x, crop.y, crop.width, crop.height);
    }

    /// Replace the filter settings (re-clamped).
    pub fn set_filters(&mut self, filters: FilterSettings) {
        self.filters = FilterSettings::new(
            filters.brightness,
            filters.contrast,
            filters.saturation,
            filters.grayscale,
        );
    }

    /// Set the monitoring playback rate, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f64) {
        self.playback_speed = speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED);
    }

    /// Set the audio gain, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Drop the source-derived fields, keeping crop/filters/speed/volume.
    pub fn clear_source(&mut self) {
        self.duration = 0.0;
        self.trim_start = 0.0;
        self.trim_end = 0.0;
    }

    /// Restore every parameter to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Capture the immutable snapshot an export job runs from.
    ///
    /// The trim window is clamped against the probed duration; a window
    /// that is empty or inverted after clamping is rejected here, before
    /// any pipeline resource is opened.
    pub fn snapshot_for(&self, info: &MediaInfo) -> Result<EditParams, EditError> {
        if info.duration_secs <= 0.0 {
            return Err(EditError::EmptySource);
        }

        let trim_start = self.trim_start.clamp(0.0, info.duration_secs);
        let trim_end = self.trim_end.clamp(0.0, info.duration_secs);
        if trim_start >= trim_end {
            return Err(EditError::InvalidTrim {
                start: trim_start,
                end: trim_end,
            });
        }

        Ok(EditParams {
            trim_start,
            trim_end,
            crop: self.crop,
            filters: self.filters,
            playback_speed: self.playback_speed,
            volume: self.volume,
        })
    }
}

/// Errors produced when deriving a snapshot from the live state.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("Invalid trim window: start {start:.3}s is not before end {end:.3}s")]
    InvalidTrim { start: f64, end: f64 },

    #[error("Source has no duration")]
    EmptySource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn info(duration_secs: f64) -> MediaInfo {
        MediaInfo {
            path: PathBuf::from("clip.mp4"),
            duration_secs,
            width: 1920,
            height: 1080,
            fps: 30.0,
            audio: None,
        }
    }

    #[test]
    fn test_defaults() {
        let state = EditState::new();
        assert_eq!(state.playback_speed, 1.0);
        assert_eq!(state.volume, 1.0);
        assert!(state.crop.is_full());
        assert!(state.filters.is_identity());
        assert_eq!(state.duration, 0.0);
    }

    #[test]
    fn test_intake_resets_trim_window() {
        let mut state = EditState::new();
        state.set_trim(1.0, 4.0);
        state.set_source_duration(12.5);
        assert_eq!(state.trim_start, 0.0);
        assert_eq!(state.trim_end, 12.5);
    }

    #[test]
    fn test_trim_clamps_to_duration() {
        let mut state = EditState::new();
        state.set_source_duration(12.5);
        state.set_trim(-3.0, 1000.0);
        assert_eq!(state.trim_start, 0.0);
        assert_eq!(state.trim_end, 12.5);
    }

    #[test]
    fn test_clear_source_keeps_visual_parameters() {
        let mut state = EditState::new();
        state.set_source_duration(10.0);
        state.set_speed(2.0);
        state.set_volume(0.5);
        state.set_crop(CropRect::new(10.0, 10.0, 50.0, 50.0));
        state.set_filters(FilterSettings::new(120.0, 100.0, 100.0, 0.0));

        state.clear_source();

        assert_eq!(state.duration, 0.0);
        assert_eq!(state.trim_end, 0.0);
        assert_eq!(state.playback_speed, 2.0);
        assert_eq!(state.volume, 0.5);
        assert_eq!(state.crop.width, 50.0);
        assert_eq!(state.filters.brightness, 120.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = EditState::new();
        state.set_source_duration(10.0);
        state.set_speed(0.25);
        state.set_filters(FilterSettings::new(0.0, 0.0, 0.0, 100.0));

        state.reset();

        assert_eq!(state, EditState::default());
    }

    #[test]
    fn test_speed_and_volume_clamped() {
        let mut state = EditState::new();
        state.set_speed(10.0);
        assert_eq!(state.playback_speed, MAX_PLAYBACK_SPEED);
        state.set_speed(0.0);
        assert_eq!(state.playback_speed, MIN_PLAYBACK_SPEED);
        state.set_volume(1.5);
        assert_eq!(state.volume, 1.0);
        state.set_volume(-0.5);
        assert_eq!(state.volume, 0.0);
    }

    #[test]
    fn test_snapshot_clamps_trim_end() {
        let mut state = EditState::new();
        state.set_source_duration(20.0);
        state.trim_end = 1000.0; // bypass setter to simulate stale state
        let params = state.snapshot_for(&info(12.5)).unwrap();
        assert_eq!(params.trim_end, 12.5);
        assert!((params.trim_window_secs() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_rejects_inverted_window() {
        let mut state = EditState::new();
        state.set_source_duration(10.0);
        state.set_trim(5.0, 2.0);
        let err = state.snapshot_for(&info(10.0)).unwrap_err();
        assert!(matches!(err, EditError::InvalidTrim { .. }));
    }

    #[test]
    fn test_snapshot_rejects_window_emptied_by_clamp() {
        let mut state = EditState::new();
        state.set_source_duration(30.0);
        state.set_trim(15.0, 20.0);
        // Same state against a shorter probe: both ends clamp to 12.5.
        let err = state.snapshot_for(&info(12.5)).unwrap_err();
        assert!(matches!(err, EditError::InvalidTrim { .. }));
    }

    #[test]
    fn test_snapshot_rejects_empty_source() {
        let state = EditState::new();
        let err = state.snapshot_for(&info(0.0)).unwrap_err();
        assert!(matches!(err, EditError::EmptySource));
    }

    #[test]
    fn test_snapshot_is_a_deep_copy() {
        let mut state = EditState::new();
        state.set_source_duration(10.0);
        state.set_trim(2.0, 5.0);
        let params = state.snapshot_for(&info(10.0)).unwrap();

        state.set_trim(0.0, 10.0);
        state.set_filters(FilterSettings::new(0.0, 0.0, 0.0, 100.0));

        assert_eq!(params.trim_start, 2.0);
        assert_eq!(params.trim_end, 5.0);
        assert!(params.filters.is_identity());
    }

    #[test]
    fn test_state_serialization_round_trip() {
        let mut state = EditState::new();
        state.set_source_duration(8.0);
        state.set_trim(1.0, 6.0);
        state.set_crop(CropRect::new(10.0, 20.0, 40.0, 60.0));

        let json = serde_json::to_string(&state).unwrap();
        let parsed: EditState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
