//! Export jobs: the state machine and the frame-synchronous render loop.
//!
//! A job walks the trim window one sample instant at a time, pulling a frame
//! from the source, pushing it through the crop/filter transform, and
//! handing the result to the encoder sink. Audio is routed once up front:
//! the trimmed slice is gain-adjusted and staged as a WAV temp for the
//! muxer. The artifact is written to a hidden part file and renamed into
//! place only after the encoder finishes with a non-empty output, so a
//! failed job never leaves a partial artifact behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use recut_common::clock::unix_epoch_millis;
use recut_common::error::{RecutError, RecutResult};
use recut_edit_model::EditParams;
use recut_processing_core::FrameTransform;

use crate::encoder::{write_audio_wav, EncoderSettings, EncoderSink, ExportFormat, FfmpegEncoder};
use crate::pacer::{Pacer, Pacing};
use crate::source::MediaSource;

/// Caller-tunable knobs for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub pacing: Pacing,
    /// Directory the artifact (and its part file) is written into.
    pub output_dir: PathBuf,
}

impl ExportOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            format: ExportFormat::default(),
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            pacing: Pacing::default(),
            output_dir: output_dir.into(),
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

/// Lifecycle stages of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Idle,
    Preparing,
    Recording,
    Finalizing,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStage::Succeeded | JobStage::Failed | JobStage::Cancelled
        )
    }

    /// Whether a new export request is accepted in this stage.
    pub fn accepts_new_job(&self) -> bool {
        matches!(self, JobStage::Idle) || self.is_terminal()
    }
}

/// Snapshot pushed to the progress callback.
///
/// `percent` is floored at 1 while frames are flowing and only reaches 100
/// once the artifact has been persisted; a failed job reports 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub percent: u8,
    pub frames_rendered: u64,
    pub total_frames: u64,
    pub stage: JobStage,
}

/// Callback invoked with progress updates during an export.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Shared cancellation flag, observed between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a successful export produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReceipt {
    /// Timestamped artifact file name, e.g. `edited-video-1724300000000.webm`.
    pub file_name: String,
    pub path: PathBuf,
    pub byte_size: u64,
    /// Rendered duration in seconds.
    pub duration_secs: f64,
    pub frames_rendered: u64,
}

/// One export run over an immutable parameter snapshot.
pub struct ExportJob {
    params: EditParams,
    options: ExportOptions,
    cancel: CancelToken,
    stage: JobStage,
    progress_percent: u8,
    frames_rendered: u64,
    total_frames: u64,
    part_path: Option<PathBuf>,
    audio_temp: Option<PathBuf>,
}

impl ExportJob {
    /// Builds a job from a validated parameter snapshot.
    ///
    /// Edits made after this point do not affect the job.
    pub fn new(params: EditParams, options: ExportOptions, cancel: CancelToken) -> Self {
        Self {
            params,
            options,
            cancel,
            stage: JobStage::Idle,
            progress_percent: 0,
            frames_rendered: 0,
            total_frames: 0,
            part_path: None,
            audio_temp: None,
        }
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Runs the job to a terminal stage.
    ///
    /// A job runs once; rerunning a finished or in-flight job is rejected
    /// with `Busy`.
    pub fn run(
        &mut self,
        source: &mut dyn MediaSource,
        sink: &mut dyn EncoderSink,
        progress: Option<&ProgressCallback>,
    ) -> RecutResult<ExportReceipt> {
        if self.stage != JobStage::Idle {
            return Err(RecutError::Busy);
        }

        let started = Instant::now();
        tracing::info!(
            trim_start = self.params.trim_start,
            trim_end = self.params.trim_end,
            speed = self.params.playback_speed,
            volume = self.params.volume,
            format = ?self.options.format,
            "Starting export"
        );
        self.enter(JobStage::Preparing, progress);

        let outcome = self.drive(source, sink, progress);
        // The walk is over either way; the decoder is not needed past it.
        source.close();

        match outcome {
            Ok(receipt) => {
                self.progress_percent = 100;
                self.enter(JobStage::Succeeded, progress);
                tracing::info!(
                    file_name = %receipt.file_name,
                    byte_size = receipt.byte_size,
                    frames = receipt.frames_rendered,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Export finished"
                );
                Ok(receipt)
            }
            Err(err) if err.is_cancelled() => {
                self.discard_temps();
                self.enter(JobStage::Cancelled, progress);
                tracing::info!(frames = self.frames_rendered, "Export cancelled");
                Err(err)
            }
            Err(err) => {
                self.discard_temps();
                self.progress_percent = 0;
                self.enter(JobStage::Failed, progress);
                tracing::error!(error = %err, "Export failed");
                Err(err)
            }
        }
    }

    fn drive(
        &mut self,
        source: &mut dyn MediaSource,
        sink: &mut dyn EncoderSink,
        progress: Option<&ProgressCallback>,
    ) -> RecutResult<ExportReceipt> {
        let info = source.info().clone();
        let mut pacer = Pacer::new(
            self.params.trim_start,
            self.params.trim_end,
            info.fps,
            self.options.pacing,
        );
        self.total_frames = pacer.total_instants();

        std::fs::create_dir_all(&self.options.output_dir).map_err(|e| {
            RecutError::persist(format!(
                "Failed to create output directory {}: {e}",
                self.options.output_dir.display()
            ))
        })?;
        let file_name = artifact_file_name(self.options.format);
        let part_path = self
            .options
            .output_dir
            .join(format!(".{file_name}.part"));
        self.part_path = Some(part_path.clone());

        let audio_path = self.route_audio(source, &part_path)?;
        source.seek(self.params.trim_start)?;

        let transform = FrameTransform::new(info.width, info.height, &self.params);
        let (width, height) = transform.output_size();
        let mut rendered = transform.allocate_output();

        sink.start(&EncoderSettings {
            width,
            height,
            fps: pacer.fps(),
            format: self.options.format,
            video_bitrate_kbps: self.options.video_bitrate_kbps,
            audio_bitrate_kbps: self.options.audio_bitrate_kbps,
            audio_path,
            output_path: part_path.clone(),
        })?;

        self.enter(JobStage::Recording, progress);
        while let Some(instant) = pacer.next_instant() {
            if self.cancel.is_cancelled() {
                return Err(RecutError::Cancelled);
            }
            let Some(frame) = source.next_frame()? else {
                // Source ran dry before the trim end.
                break;
            };
            transform.apply(&frame, &mut rendered);
            sink.write_frame(&rendered)?;
            self.frames_rendered += 1;
            self.bump_progress(pacer.progress_percent(instant.time_secs), progress);
        }
        if self.frames_rendered == 0 {
            return Err(RecutError::encode("No video data recorded"));
        }
        if self.cancel.is_cancelled() {
            return Err(RecutError::Cancelled);
        }

        self.enter(JobStage::Finalizing, progress);
        let byte_size = sink.finish()?;
        if byte_size == 0 {
            return Err(RecutError::encode("Generated video file is empty"));
        }

        let final_path = self.options.output_dir.join(&file_name);
        std::fs::rename(&part_path, &final_path).map_err(|e| {
            RecutError::persist(format!(
                "Failed to move artifact into place at {}: {e}",
                final_path.display()
            ))
        })?;
        self.part_path = None;
        if let Some(audio) = self.audio_temp.take() {
            std::fs::remove_file(audio).ok();
        }

        Ok(ExportReceipt {
            file_name,
            path: final_path,
            byte_size,
            duration_secs: self.frames_rendered as f64 / pacer.fps(),
            frames_rendered: self.frames_rendered,
        })
    }

    /// Extracts the trimmed audio slice, applies the volume gain, and
    /// stages it as a WAV temp next to the part file.
    fn route_audio(
        &mut self,
        source: &mut dyn MediaSource,
        part_path: &Path,
    ) -> RecutResult<Option<PathBuf>> {
        let window = self.params.trim_window_secs();
        let Some(mut slice) = source.read_audio_slice(self.params.trim_start, window)? else {
            return Ok(None);
        };
        if slice.samples.is_empty() {
            return Ok(None);
        }

        slice.apply_gain(self.params.volume);
        let path = part_path.with_extension("audio.wav");
        write_audio_wav(&slice, &path)?;
        tracing::debug!(
            samples = slice.samples.len(),
            volume = self.params.volume,
            "Routed audio slice"
        );
        self.audio_temp = Some(path.clone());
        Ok(Some(path))
    }

    fn enter(&mut self, stage: JobStage, progress: Option<&ProgressCallback>) {
        self.stage = stage;
        tracing::debug!(stage = ?stage, percent = self.progress_percent, "Export stage");
        self.emit(progress);
    }

    fn bump_progress(&mut self, percent: u8, progress: Option<&ProgressCallback>) {
        // Progress never moves backwards while frames are flowing.
        self.progress_percent = self.progress_percent.max(percent);
        self.emit(progress);
    }

    fn emit(&self, progress: Option<&ProgressCallback>) {
        if let Some(callback) = progress {
            callback(ExportProgress {
                percent: self.progress_percent,
                frames_rendered: self.frames_rendered,
                total_frames: self.total_frames,
                stage: self.stage,
            });
        }
    }

    fn discard_temps(&mut self) {
        if let Some(part) = self.part_path.take() {
            std::fs::remove_file(part).ok();
        }
        if let Some(audio) = self.audio_temp.take() {
            std::fs::remove_file(audio).ok();
        }
    }
}

/// Runs one export end to end with the production ffmpeg sink.
///
/// Blocks until the job reaches a terminal stage. [`crate::EditSession`]
/// wraps this on a blocking task for async callers.
pub fn export_edit(
    source: &mut dyn MediaSource,
    params: EditParams,
    options: ExportOptions,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
) -> RecutResult<ExportReceipt> {
    let mut sink = FfmpegEncoder::new();
    let mut job = ExportJob::new(params, options, cancel);
    job.run(source, &mut sink, progress.as_ref())
}

fn artifact_file_name(format: ExportFormat) -> String {
    format!("edited-video-{}.{}", unix_epoch_millis(), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_acceptance_matrix() {
        assert!(JobStage::Idle.accepts_new_job());
        assert!(JobStage::Succeeded.accepts_new_job());
        assert!(JobStage::Failed.accepts_new_job());
        assert!(JobStage::Cancelled.accepts_new_job());

        assert!(!JobStage::Preparing.accepts_new_job());
        assert!(!JobStage::Recording.accepts_new_job());
        assert!(!JobStage::Finalizing.accepts_new_job());
    }

    #[test]
    fn test_terminal_stages() {
        for stage in [JobStage::Succeeded, JobStage::Failed, JobStage::Cancelled] {
            assert!(stage.is_terminal());
        }
        for stage in [
            JobStage::Idle,
            JobStage::Preparing,
            JobStage::Recording,
            JobStage::Finalizing,
        ] {
            assert!(!stage.is_terminal());
        }
    }

    #[test]
    fn test_artifact_file_name_shape() {
        let name = artifact_file_name(ExportFormat::Webm);
        assert!(name.starts_with("edited-video-"));
        assert!(name.ends_with(".webm"));
        let millis: i64 = name
            .trim_start_matches("edited-video-")
            .trim_end_matches(".webm")
            .parse()
            .unwrap();
        assert!(millis > 0);

        assert!(artifact_file_name(ExportFormat::Mp4H264).ends_with(".mp4"));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_export_options_defaults() {
        let options = ExportOptions::default();
        assert_eq!(options.format, ExportFormat::Webm);
        assert_eq!(options.video_bitrate_kbps, 8000);
        assert_eq!(options.audio_bitrate_kbps, 192);
        assert_eq!(options.pacing, Pacing::SourceRate);
    }

    #[test]
    fn test_receipt_serialization() {
        let receipt = ExportReceipt {
            file_name: "edited-video-1724300000000.webm".into(),
            path: PathBuf::from("/tmp/edited-video-1724300000000.webm"),
            byte_size: 1024,
            duration_secs: 3.0,
            frames_rendered: 90,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let parsed: ExportReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, receipt);
    }

    #[test]
    fn test_stage_serialization_names() {
        let json = serde_json::to_string(&JobStage::Recording).unwrap();
        assert_eq!(json, "\"recording\"");
        let parsed: JobStage = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(parsed, JobStage::Succeeded);
    }
}
