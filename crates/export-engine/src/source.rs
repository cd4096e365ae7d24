//! Source media intake: probing and frame/audio decode via ffmpeg.
//!
//! A [`MediaSource`] hands the export loop RGBA frames and interleaved audio
//! samples. The production implementation shells out to `ffprobe` for
//! metadata and to `ffmpeg` for decoding, keeping a raw-video pipe open for
//! the duration of one export.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use recut_common::error::{RecutError, RecutResult};
use recut_edit_model::{is_supported_container, AudioLayout, MediaInfo};
use recut_processing_core::{AudioBuffer, FrameBuffer};

/// A decodable source asset.
///
/// Implementations are free to decode lazily; `seek` positions the stream and
/// `next_frame` pulls decoded frames in presentation order until end of
/// stream.
pub trait MediaSource: Send {
    /// Probed metadata for the asset.
    fn info(&self) -> &MediaInfo;

    /// Positions the decode cursor at `secs` from the start of the asset.
    fn seek(&mut self, secs: f64) -> RecutResult<()>;

    /// Decodes the next frame at the source's native resolution.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> RecutResult<Option<FrameBuffer>>;

    /// Decodes the audio slice `[start_secs, start_secs + duration_secs)` as
    /// interleaved f32 samples. Returns `Ok(None)` for sources without an
    /// audio stream.
    fn read_audio_slice(
        &mut self,
        start_secs: f64,
        duration_secs: f64,
    ) -> RecutResult<Option<AudioBuffer>>;

    /// Tears down live decode resources. Reading again requires a seek.
    fn close(&mut self) {}
}

/// Returns true when both `ffmpeg` and `ffprobe` resolve on PATH.
pub fn ffmpeg_available() -> bool {
    command_exists("ffmpeg") && command_exists("ffprobe")
}

fn command_exists(name: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {name}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// File-backed source decoded through an ffmpeg subprocess.
///
/// The decode pipe is spawned on the first `seek` and replaced on every
/// subsequent one, so a handle can be reused across export attempts.
#[derive(Debug)]
pub struct FfmpegSource {
    path: PathBuf,
    info: MediaInfo,
    frame_size: usize,
    decoder: Option<DecodePipe>,
}

#[derive(Debug)]
struct DecodePipe {
    process: Child,
    stdout: BufReader<ChildStdout>,
}

impl Drop for DecodePipe {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

impl FfmpegSource {
    /// Opens and probes a source file.
    ///
    /// Fails with `UnsupportedSource` for containers outside the accepted
    /// set and with `Decode` when probing finds no video stream.
    pub fn open(path: impl AsRef<Path>) -> RecutResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RecutError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if !is_supported_container(path) {
            return Err(RecutError::unsupported_source(format!(
                "Not an accepted video container: {}",
                path.display()
            )));
        }

        let info = probe_media(path)?;
        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            duration_secs = info.duration_secs,
            has_audio = info.has_audio(),
            "Probed source media"
        );

        Ok(Self {
            path: path.to_path_buf(),
            frame_size: FrameBuffer::byte_len(info.width, info.height),
            info,
            decoder: None,
        })
    }

    fn spawn_decoder(&self, secs: f64) -> RecutResult<DecodePipe> {
        let size = format!("{}x{}", self.info.width, self.info.height);
        let mut process = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{secs:.6}"), "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-s", &size, "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RecutError::decode(format!("Failed to spawn ffmpeg decoder: {e}")))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| RecutError::decode("Decoder stdout was not captured"))?;

        Ok(DecodePipe {
            process,
            // Buffer two frames so short reads from the pipe stay cheap.
            stdout: BufReader::with_capacity(self.frame_size * 2, stdout),
        })
    }
}

impl MediaSource for FfmpegSource {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn seek(&mut self, secs: f64) -> RecutResult<()> {
        // Replacing the pipe kills any previous decoder.
        self.decoder = Some(self.spawn_decoder(secs.max(0.0))?);
        Ok(())
    }

    fn next_frame(&mut self) -> RecutResult<Option<FrameBuffer>> {
        let pipe = self
            .decoder
            .as_mut()
            .ok_or_else(|| RecutError::decode("Decoder read before seek"))?;

        let mut data = vec![0u8; self.frame_size];
        match pipe.stdout.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Stream exhausted; reap the decoder right away.
                self.decoder = None;
                return Ok(None);
            }
            Err(e) => {
                return Err(RecutError::decode(format!(
                    "Failed to read frame from decoder: {e}"
                )))
            }
        }

        FrameBuffer::from_rgba(self.info.width, self.info.height, data)
            .map(Some)
            .ok_or_else(|| RecutError::decode("Decoder returned a short frame"))
    }

    fn read_audio_slice(
        &mut self,
        start_secs: f64,
        duration_secs: f64,
    ) -> RecutResult<Option<AudioBuffer>> {
        let Some(layout) = self.info.audio else {
            return Ok(None);
        };

        let output = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-ss",
                &format!("{:.6}", start_secs.max(0.0)),
                "-t",
                &format!("{:.6}", duration_secs.max(0.0)),
                "-i",
            ])
            .arg(&self.path)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ar",
                &layout.sample_rate.to_string(),
                "-ac",
                &layout.channels.to_string(),
                "-",
            ])
            .output()
            .map_err(|e| RecutError::decode(format!("Failed to run ffmpeg audio decode: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecutError::decode(format!(
                "Audio decode failed: {}",
                stderr.trim()
            )));
        }

        let samples: Vec<f32> = output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Some(AudioBuffer::new(samples, layout)))
    }

    fn close(&mut self) {
        self.decoder = None;
    }
}

/// Probes container metadata with ffprobe.
///
/// Three small invocations keep the parsing trivial: one for the video
/// stream, one for the container duration, one for the audio stream.
fn probe_media(path: &Path) -> RecutResult<MediaInfo> {
    let video_line = ffprobe_csv(
        path,
        &["-select_streams", "v:0", "-show_entries", "stream=width,height,r_frame_rate"],
    )?;
    let (width, height, fps) = parse_video_probe(&video_line).ok_or_else(|| {
        RecutError::decode(format!("No video stream found in {}", path.display()))
    })?;

    let duration_line = ffprobe_csv(path, &["-show_entries", "format=duration"])?;
    let duration_secs = parse_duration(&duration_line).unwrap_or(0.0);
    if duration_secs <= 0.0 {
        return Err(RecutError::decode(format!(
            "Source reports no playable duration: {}",
            path.display()
        )));
    }

    let audio_line = ffprobe_csv(
        path,
        &["-select_streams", "a:0", "-show_entries", "stream=sample_rate,channels"],
    )?;
    let audio = parse_audio_probe(&audio_line);

    Ok(MediaInfo {
        path: path.to_path_buf(),
        duration_secs,
        width,
        height,
        fps,
        audio,
    })
}

fn ffprobe_csv(path: &Path, selector: &[&str]) -> RecutResult<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(selector)
        .args(["-of", "csv=p=0"])
        .arg(path)
        .output()
        .map_err(|e| RecutError::decode(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RecutError::decode(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_video_probe(line: &str) -> Option<(u32, u32, f64)> {
    let mut parts = line.split(',');
    let width: u32 = parts.next()?.trim().parse().ok()?;
    let height: u32 = parts.next()?.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    let fps = parts
        .next()
        .and_then(parse_frame_rate)
        .unwrap_or(recut_common::clock::FALLBACK_FPS);
    Some((width, height, fps))
}

/// Parses ffprobe's rational frame rate, e.g. `30/1` or `30000/1001`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.trim().split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn parse_duration(line: &str) -> Option<f64> {
    let secs: f64 = line.trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

fn parse_audio_probe(line: &str) -> Option<AudioLayout> {
    let mut parts = line.split(',');
    let sample_rate: u32 = parts.next()?.trim().parse().ok()?;
    let channels: u16 = parts.next()?.trim().parse().ok()?;
    if sample_rate == 0 || channels == 0 {
        return None;
    }
    Some(AudioLayout {
        sample_rate,
        channels,
    })
}
