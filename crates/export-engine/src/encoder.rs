//! Encoder sinks: muxing transformed frames and routed audio into the
//! export artifact.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use recut_common::error::{RecutError, RecutResult};
use recut_processing_core::{AudioBuffer, FrameBuffer};

/// Artifact container and codec pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// VP9 video with Opus audio. The default.
    #[default]
    Webm,
    /// H.264 video with AAC audio.
    Mp4H264,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4H264 => "mp4",
        }
    }
}

/// Everything a sink needs to accept frames for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Output frame width in pixels.
    pub width: u32,
    /// Output frame height in pixels.
    pub height: u32,
    /// Frame rate the timestamps are derived from.
    pub fps: f64,
    pub format: ExportFormat,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    /// Pre-rendered audio track to mux in, if the job routed one.
    pub audio_path: Option<PathBuf>,
    /// Destination the sink writes to. The job renames this into place
    /// after a successful finish.
    pub output_path: PathBuf,
}

/// Consumes transformed frames and produces the final artifact.
pub trait EncoderSink: Send {
    /// Opens the sink. Must be called exactly once, before any frame.
    fn start(&mut self, settings: &EncoderSettings) -> RecutResult<()>;

    /// Appends one frame in presentation order.
    fn write_frame(&mut self, frame: &FrameBuffer) -> RecutResult<()>;

    /// Flushes and closes the sink, returning the artifact's byte size.
    fn finish(&mut self) -> RecutResult<u64>;
}

/// Sink backed by an ffmpeg subprocess fed raw RGBA over stdin.
pub struct FfmpegEncoder {
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    output_path: Option<PathBuf>,
    frame_size: usize,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            process: None,
            stdin: None,
            stderr_task: None,
            output_path: None,
            frame_size: 0,
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderSink for FfmpegEncoder {
    fn start(&mut self, settings: &EncoderSettings) -> RecutResult<()> {
        if self.process.is_some() {
            return Err(RecutError::encode("Encoder already started"));
        }

        let args = encoder_args(settings);
        tracing::debug!(args = ?args, "Spawning ffmpeg encoder");

        let mut process = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecutError::encode(format!("Failed to spawn ffmpeg encoder: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| RecutError::encode("Encoder stdin was not captured"))?;

        // Drain stderr on a thread so a chatty encoder can never stall on a
        // full pipe; the transcript is surfaced on failure.
        self.stderr_task = process.stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let mut reader = BufReader::new(stderr);
                let _ = reader.read_to_string(&mut buf);
                buf
            })
        });

        self.stdin = Some(stdin);
        self.process = Some(process);
        self.output_path = Some(settings.output_path.clone());
        self.frame_size = FrameBuffer::byte_len(settings.width, settings.height);
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> RecutResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RecutError::encode("Encoder received a frame before start"))?;
        debug_assert_eq!(frame.data().len(), self.frame_size);

        stdin
            .write_all(frame.data())
            .map_err(|e| RecutError::encode(format!("Failed to write frame to encoder: {e}")))
    }

    fn finish(&mut self) -> RecutResult<u64> {
        let mut process = self
            .process
            .take()
            .ok_or_else(|| RecutError::encode("Encoder finished before start"))?;

        // Closing stdin signals end of stream.
        drop(self.stdin.take());

        let status = process
            .wait()
            .map_err(|e| RecutError::encode(format!("Failed to wait for encoder: {e}")))?;
        let stderr = self
            .stderr_task
            .take()
            .and_then(|task| task.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(RecutError::encode(format!(
                "ffmpeg encoder failed ({status}): {}",
                stderr.trim()
            )));
        }

        let output_path = self
            .output_path
            .take()
            .ok_or_else(|| RecutError::encode("Encoder lost its output path"))?;
        let metadata = std::fs::metadata(&output_path).map_err(|e| {
            RecutError::encode(format!(
                "Encoder produced no output at {}: {e}",
                output_path.display()
            ))
        })?;
        Ok(metadata.len())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}

/// Full ffmpeg argument list for one encode: raw RGBA on stdin, an optional
/// WAV second input, codec selection per format, explicit stream mapping
/// when audio is present.
fn encoder_args(settings: &EncoderSettings) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", settings.width, settings.height),
        "-r".into(),
        format!("{}", settings.fps),
        "-i".into(),
        "-".into(),
    ];

    if let Some(audio) = &settings.audio_path {
        args.push("-i".into());
        args.push(audio.display().to_string());
    }

    let video_bitrate = format!("{}k", settings.video_bitrate_kbps);
    match settings.format {
        ExportFormat::Webm => {
            args.extend(["-c:v".into(), "libvpx-vp9".into(), "-b:v".into(), video_bitrate]);
        }
        ExportFormat::Mp4H264 => {
            args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                "medium".into(),
                "-profile:v".into(),
                "high".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-b:v".into(),
                video_bitrate,
                "-movflags".into(),
                "+faststart".into(),
            ]);
        }
    }

    if settings.audio_path.is_some() {
        args.extend(["-map".into(), "0:v".into(), "-map".into(), "1:a".into()]);
        let audio_bitrate = format!("{}k", settings.audio_bitrate_kbps);
        match settings.format {
            ExportFormat::Webm => {
                args.extend(["-c:a".into(), "libopus".into(), "-b:a".into(), audio_bitrate]);
            }
            ExportFormat::Mp4H264 => {
                args.extend(["-c:a".into(), "aac".into(), "-b:a".into(), audio_bitrate]);
            }
        }
    }

    args.push(settings.output_path.display().to_string());
    args
}

/// Writes a gain-adjusted audio slice as a 32-bit float WAV for the muxer.
pub fn write_audio_wav(buffer: &AudioBuffer, path: &Path) -> RecutResult<()> {
    let spec = hound::WavSpec {
        channels: buffer.layout.channels,
        sample_rate: buffer.layout.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| RecutError::encode(format!("Failed to create audio temp: {e}")))?;
    for &sample in &buffer.samples {
        writer
            .write_sample(sample)
            .map_err(|e| RecutError::encode(format!("Failed to write audio temp: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| RecutError::encode(format!("Failed to finalize audio temp: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_edit_model::AudioLayout;

    fn settings(format: ExportFormat, audio: bool) -> EncoderSettings {
        EncoderSettings {
            width: 640,
            height: 360,
            fps: 30.0,
            format,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            audio_path: audio.then(|| PathBuf::from("/tmp/a.wav")),
            output_path: PathBuf::from("/tmp/out.webm"),
        }
    }

    fn contains_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_encoder_args_webm() {
        let args = encoder_args(&settings(ExportFormat::Webm, false));
        assert_eq!(args[0], "-y");
        assert!(contains_pair(&args, "-f", "rawvideo"));
        assert!(contains_pair(&args, "-s", "640x360"));
        assert!(contains_pair(&args, "-c:v", "libvpx-vp9"));
        assert!(contains_pair(&args, "-b:v", "8000k"));
        assert_eq!(args.last().unwrap(), "/tmp/out.webm");
        // No audio input, no mapping.
        assert!(!args.contains(&"-map".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    }

    #[test]
    fn test_encoder_args_webm_with_audio() {
        let args = encoder_args(&settings(ExportFormat::Webm, true));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 2);
        assert!(contains_pair(&args, "-map", "0:v"));
        assert!(contains_pair(&args, "-map", "1:a"));
        assert!(contains_pair(&args, "-c:a", "libopus"));
        assert!(contains_pair(&args, "-b:a", "192k"));
    }

    #[test]
    fn test_encoder_args_mp4() {
        let args = encoder_args(&settings(ExportFormat::Mp4H264, true));
        assert!(contains_pair(&args, "-c:v", "libx264"));
        assert!(contains_pair(&args, "-pix_fmt", "yuv420p"));
        assert!(contains_pair(&args, "-c:a", "aac"));
        assert!(args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ExportFormat::Webm.extension(), "webm");
        assert_eq!(ExportFormat::Mp4H264.extension(), "mp4");
        assert_eq!(ExportFormat::default(), ExportFormat::Webm);
    }

    #[test]
    fn test_write_audio_wav_roundtrip() {
        let layout = AudioLayout {
            sample_rate: 48000,
            channels: 2,
        };
        let buffer = AudioBuffer::new(vec![0.0, 0.25, -0.5, 1.0], layout);
        let path = std::env::temp_dir().join("recut_encoder_wav_test.wav");

        write_audio_wav(&buffer, &path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0.0, 0.25, -0.5, 1.0]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_frame_before_start_fails() {
        let mut encoder = FfmpegEncoder::new();
        let frame = FrameBuffer::new(2, 2);
        assert!(encoder.write_frame(&frame).is_err());
        assert!(encoder.finish().is_err());
    }
}
