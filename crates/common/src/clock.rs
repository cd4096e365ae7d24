//! Clock and timing utilities for paced media traversal.
//!
//! Export walks source time at the native frame interval. This module
//! provides:
//! - Frame cadence math (fps to interval, window to frame count)
//! - A wall-clock rate controller for self-throttling loops

use std::time::{Duration, Instant};

/// Frame rate used when a source reports a missing or nonsensical rate.
pub const FALLBACK_FPS: f64 = 30.0;

/// Frame cadence derived from a source's native frame rate.
///
/// All instant enumeration across a trim window goes through this type so
/// that frame counting and interval math stay consistent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCadence {
    fps: f64,
}

impl FrameCadence {
    /// Create a cadence for the given frames-per-second rate.
    ///
    /// Non-finite or non-positive rates fall back to [`FALLBACK_FPS`].
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            FALLBACK_FPS
        };
        Self { fps }
    }

    /// The frames-per-second rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Seconds between consecutive sample instants.
    pub fn frame_interval_secs(&self) -> f64 {
        1.0 / self.fps
    }

    /// Number of sample instants in a `[start, start + window_secs)` window.
    ///
    /// Always at least one, so a window shorter than a single frame
    /// interval still yields a frame.
    pub fn frames_in_window(&self, window_secs: f64) -> u64 {
        if !window_secs.is_finite() || window_secs <= 0.0 {
            return 1;
        }
        ((window_secs * self.fps).ceil() as u64).max(1)
    }
}

/// Wall-clock throttle for the export loop.
///
/// `throttle` sleeps until the next frame deadline so a decode/render loop
/// paces near the source rate instead of busy-spinning. The first call
/// never sleeps. An `unlimited` controller turns every call into a no-op.
#[derive(Debug)]
pub struct RateController {
    target_interval: Duration,
    next_deadline: Option<Instant>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    ///
    /// A non-finite or non-positive rate yields an unlimited controller.
    pub fn new(target_hz: f64) -> Self {
        let target_interval = if target_hz.is_finite() && target_hz > 0.0 {
            Duration::from_secs_f64(1.0 / target_hz)
        } else {
            Duration::ZERO
        };
        Self {
            target_interval,
            next_deadline: None,
        }
    }

    /// Controller that never sleeps.
    pub fn unlimited() -> Self {
        Self {
            target_interval: Duration::ZERO,
            next_deadline: None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.target_interval.is_zero()
    }

    /// Sleep until the next deadline, then advance it by one interval.
    ///
    /// Deadlines advance from the previous deadline, not from wake-up time,
    /// so oversleep on one tick does not accumulate. A loop that falls more
    /// than one interval behind re-anchors to now instead of sprinting.
    pub fn throttle(&mut self) {
        if self.target_interval.is_zero() {
            return;
        }
        let now = Instant::now();
        match self.next_deadline {
            None => {
                self.next_deadline = Some(now + self.target_interval);
            }
            Some(deadline) => {
                if deadline > now {
                    std::thread::sleep(deadline - now);
                }
                let base = deadline.max(now);
                self.next_deadline = Some(base + self.target_interval);
            }
        }
    }
}

/// Current wall-clock time as milliseconds since the Unix epoch.
///
/// Used for generated artifact names.
pub fn unix_epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
