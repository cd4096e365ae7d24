//! Live monitoring helpers.
//!
//! Generates the CSS-equivalent style for the current edit state so UI
//! clients can preview crop and filters without touching pixel data, and
//! enforces trim bounds during interactive playback. The filter list keeps
//! the exact stage order of the export pipeline.

use recut_edit_model::EditState;
use serde::{Deserialize, Serialize};

/// CSS-equivalent monitoring style for a live edit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewStyle {
    /// Color filter list, export stage order.
    pub filter: String,
    /// Geometric magnification compensating the clip.
    pub transform: String,
    pub transform_origin: String,
    /// Inset clip matching the crop rectangle.
    pub clip_path: String,
    /// Monitoring playback rate.
    pub playback_rate: f64,
    /// Monitoring gain.
    pub monitor_gain: f64,
}

/// Build the monitoring style for the current state.
pub fn preview_style(state: &EditState) -> PreviewStyle {
    let crop = &state.crop;
    let filters = &state.filters;

    PreviewStyle {
        filter: format!(
            "brightness({}%) contrast({}%) saturate({}%) grayscale({}%)",
            filters.brightness, filters.contrast, filters.saturation, filters.grayscale
        ),
        transform: format!("scale({:.4})", crop.preview_scale()),
        transform_origin: "top left".to_string(),
        clip_path: format!(
            "inset({}% {}% {}% {}%)",
            crop.y,
            100.0 - crop.x - crop.width,
            100.0 - crop.y - crop.height,
            crop.x
        ),
        playback_rate: state.playback_speed,
        monitor_gain: state.volume,
    }
}

/// What the UI should do after reporting a playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayheadAction {
    /// Keep playing.
    Continue,
    /// Pause playback and seek the player to the returned position.
    PauseAndRewind,
}

/// Trim-bound playhead state for interactive monitoring.
///
/// The UI owns the actual player; this tracks the cursor and answers what
/// the player must do so playback never escapes `[trim_start, trim_end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Playhead {
    trim_start: f64,
    trim_end: f64,
    position: f64,
    playing: bool,
}

impl Playhead {
    pub fn new(trim_start: f64, trim_end: f64) -> Self {
        let trim_start = trim_start.max(0.0);
        let trim_end = trim_end.max(trim_start);
        Self {
            trim_start,
            trim_end,
            position: trim_start,
            playing: false,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Adopt a new trim window, snapping the cursor inside it.
    pub fn set_window(&mut self, trim_start: f64, trim_end: f64) {
        self.trim_start = trim_start.max(0.0);
        self.trim_end = trim_end.max(self.trim_start);
        self.position = self.position.clamp(self.trim_start, self.trim_end);
    }

    /// Seek to `t`, clamped into the trim window. Returns the landed
    /// position.
    pub fn seek(&mut self, t: f64) -> f64 {
        self.position = t.clamp(self.trim_start, self.trim_end);
        self.position
    }

    /// Start playback. A cursor at or past the window end snaps back to the
    /// start first. Returns the position the player must be at.
    pub fn play(&mut self) -> f64 {
        if self.position >= self.trim_end {
            self.position = self.trim_start;
        }
        self.playing = true;
        self.position
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Seek to the window start. The play/pause state is left as is, so a
    /// paused player stays paused after the jump.
    pub fn restart(&mut self) -> f64 {
        self.position = self.trim_start;
        self.position
    }

    /// Record the player's reported time.
    ///
    /// Reaching the window end pauses and rewinds the cursor to the start;
    /// the caller must apply the same to the player.
    pub fn advance_to(&mut self, t: f64) -> PlayheadAction {
        if t >= self.trim_end {
            self.position = self.trim_start;
            self.playing = false;
            PlayheadAction::PauseAndRewind
        } else {
            self.position = t.max(self.trim_start);
            PlayheadAction::Continue
        }
    }
}
