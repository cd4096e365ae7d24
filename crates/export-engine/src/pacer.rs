//! Trim-window pacing.
//!
//! The pacer enumerates the sample instants an export visits: one per source
//! frame interval, from the trim start up to but never past the trim end.
//! In `SourceRate` mode it also throttles the loop to wall-clock frame
//! cadence so downstream sinks observe realtime delivery.

use serde::{Deserialize, Serialize};

use recut_common::clock::{FrameCadence, RateController};

/// Delivery pacing for the export loop.
///
/// Instants are identical in both modes; only wall-clock throttling differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pacing {
    /// Sleep between frames to match the source frame rate.
    #[default]
    SourceRate,
    /// Run flat out.
    Unthrottled,
}

/// One step of the export walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleInstant {
    /// Zero-based frame index within the trim window.
    pub index: u64,
    /// Source timestamp in seconds.
    pub time_secs: f64,
}

/// Enumerates sample instants across `[trim_start, trim_end)` at the
/// source's native cadence.
///
/// Yields at least one instant for any positive window, so every export
/// contains at least one frame.
#[derive(Debug)]
pub struct Pacer {
    trim_start: f64,
    trim_end: f64,
    cadence: FrameCadence,
    throttle: RateController,
    index: u64,
    total: u64,
}

impl Pacer {
    pub fn new(trim_start: f64, trim_end: f64, fps: f64, pacing: Pacing) -> Self {
        let cadence = FrameCadence::new(fps);
        let total = cadence.frames_in_window(trim_end - trim_start);
        let throttle = match pacing {
            Pacing::SourceRate => RateController::new(cadence.fps()),
            Pacing::Unthrottled => RateController::unlimited(),
        };
        Self {
            trim_start,
            trim_end,
            cadence,
            throttle,
            index: 0,
            total,
        }
    }

    pub fn fps(&self) -> f64 {
        self.cadence.fps()
    }

    /// Number of instants the full walk will yield.
    pub fn total_instants(&self) -> u64 {
        self.total
    }

    /// Blocks until the next instant is due, then yields it.
    ///
    /// Returns `None` once the walk has covered the trim window.
    pub fn next_instant(&mut self) -> Option<SampleInstant> {
        if self.index >= self.total {
            return None;
        }
        let time_secs = self.trim_start + self.index as f64 * self.cadence.frame_interval_secs();
        // Rounding can land the final step on the boundary; the window is
        // half-open, so stop short. The first instant always passes.
        if self.index > 0 && time_secs >= self.trim_end {
            self.index = self.total;
            return None;
        }

        self.throttle.throttle();
        let instant = SampleInstant {
            index: self.index,
            time_secs,
        };
        self.index += 1;
        Some(instant)
    }

    /// Integer progress for an instant: floored at 1, capped at 99.
    ///
    /// 100 is reserved for a successfully persisted artifact.
    pub fn progress_percent(&self, time_secs: f64) -> u8 {
        let window = self.trim_end - self.trim_start;
        if window <= 0.0 {
            return 1;
        }
        let percent = ((time_secs - self.trim_start) / window * 100.0).round();
        percent.clamp(1.0, 99.0) as u8
    }
}
