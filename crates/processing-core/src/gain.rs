//! Audio gain stage.
//!
//! The only audio processing export performs: a linear per-sample volume
//! multiply. Sample count and rate never change here.

use recut_edit_model::AudioLayout;

/// An interleaved f32 audio slice with its layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub layout: AudioLayout,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, layout: AudioLayout) -> Self {
        Self { samples, layout }
    }

    /// Silence covering `secs` at the given layout.
    pub fn silence(secs: f64, layout: AudioLayout) -> Self {
        let per_channel = (secs * layout.sample_rate as f64).round() as usize;
        Self {
            samples: vec![0.0; per_channel * layout.channels as usize],
            layout,
        }
    }

    /// Duration covered by the interleaved samples.
    pub fn duration_secs(&self) -> f64 {
        if self.layout.sample_rate == 0 || self.layout.channels == 0 {
            return 0.0;
        }
        let frames = self.samples.len() / self.layout.channels as usize;
        frames as f64 / self.layout.sample_rate as f64
    }

    /// Multiply every sample by `volume` in place.
    pub fn apply_gain(&mut self, volume: f64) {
        apply_gain(&mut self.samples, volume as f32);
    }
}

/// Multiply every sample by `volume`.
pub fn apply_gain(samples: &mut [f32], volume: f32) {
    if volume == 1.0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample *= volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO: AudioLayout = AudioLayout {
        sample_rate: 48000,
        channels: 2,
    };

    #[test]
    fn test_gain_scales_every_sample() {
        let mut samples = vec![0.5, -0.5, 1.0, -1.0];
        apply_gain(&mut samples, 0.5);
        assert_eq!(samples, vec![0.25, -0.25, 0.5, -0.5]);
    }

    #[test]
    fn test_zero_volume_silences() {
        let mut buffer = AudioBuffer::new(vec![0.7, -0.3, 0.1], STEREO);
        buffer.apply_gain(0.0);
        assert!(buffer.samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_sample_count_is_preserved() {
        let mut buffer = AudioBuffer::new(vec![0.1; 4800], STEREO);
        buffer.apply_gain(0.42);
        assert_eq!(buffer.samples.len(), 4800);
        assert_eq!(buffer.layout, STEREO);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::silence(0.5, STEREO);
        assert_eq!(buffer.samples.len(), 48000);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-9);
    }
}
