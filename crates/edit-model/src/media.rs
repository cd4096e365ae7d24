//! Source media metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Container extensions accepted at intake.
pub const SUPPORTED_CONTAINERS: &[&str] = &[
    "mp4", "m4v", "webm", "mkv", "mov", "avi", "mpg", "mpeg", "ogv", "ts",
];

/// Probed metadata for a source media file.
///
/// Captured once at intake and carried for the lifetime of the source
/// handle; the export pipeline sizes buffers and paces the trim walk from
/// these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Filesystem path of the source.
    pub path: PathBuf,

    /// Total duration in seconds.
    pub duration_secs: f64,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Native frame rate.
    pub fps: f64,

    /// Audio stream layout, if the source carries audio.
    #[serde(default)]
    pub audio: Option<AudioLayout>,
}

/// Layout of a source audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioLayout {
    /// Samples per second.
    pub sample_rate: u32,

    /// Interleaved channel count.
    pub channels: u16,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Samples per channel covering `secs` of audio, zero without audio.
    pub fn audio_samples_for(&self, secs: f64) -> usize {
        match self.audio {
            Some(layout) => {
                let per_channel = (secs * layout.sample_rate as f64).round() as usize;
                per_channel * layout.channels as usize
            }
            None => 0,
        }
    }
}

/// Whether a path carries an accepted video container extension.
///
/// Intake rejects anything else before probing.
pub fn is_supported_container(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_CONTAINERS.iter().any(|c| *c == ext)
        })
        .unwrap_or(false)
}
