//! Edit sessions: the facade a UI layer drives.
//!
//! A session owns the source handle and the live edit state, serves preview
//! descriptions for the player surface, and runs export jobs on a blocking
//! task while the state machine guards against overlapping requests.

use std::path::Path;

use recut_common::error::{RecutError, RecutResult};
use recut_edit_model::{CropRect, EditState, FilterSettings, MediaInfo};
use recut_processing_core::{preview_style, Playhead, PreviewStyle};

use crate::encoder::{EncoderSink, FfmpegEncoder};
use crate::job::{
    CancelToken, ExportJob, ExportOptions, ExportReceipt, JobStage, ProgressCallback,
};
use crate::source::{ffmpeg_available, FfmpegSource, MediaSource};

/// The job task returns the source handle so it survives the export.
type JobOutcome = (Box<dyn MediaSource>, JobStage, RecutResult<ExportReceipt>);

/// One user-facing editing session over at most one source at a time.
pub struct EditSession {
    edit: EditState,
    info: Option<MediaInfo>,
    source: Option<Box<dyn MediaSource>>,
    stage: JobStage,
    cancel: CancelToken,
    job_task: Option<tokio::task::JoinHandle<JobOutcome>>,
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            edit: EditState::new(),
            info: None,
            source: None,
            stage: JobStage::Idle,
            cancel: CancelToken::new(),
            job_task: None,
        }
    }

    /// Probes and adopts a source file, replacing any previous source.
    ///
    /// On success the trim window is reset to span the full duration.
    pub fn submit_source_file(&mut self, path: impl AsRef<Path>) -> RecutResult<MediaInfo> {
        let source = FfmpegSource::open(path.as_ref())?;
        self.submit_source(Box::new(source))
    }

    /// Adopts an already-opened source handle.
    pub fn submit_source(&mut self, source: Box<dyn MediaSource>) -> RecutResult<MediaInfo> {
        if self.job_task.is_some() {
            return Err(RecutError::Busy);
        }

        let info = source.info().clone();
        tracing::info!(
            path = %info.path.display(),
            duration_secs = info.duration_secs,
            width = info.width,
            height = info.height,
            fps = info.fps,
            has_audio = info.has_audio(),
            "Source submitted"
        );

        // Replacing the handle releases the previous source's decoder.
        self.source = Some(source);
        self.edit.set_source_duration(info.duration_secs);
        self.info = Some(info.clone());
        self.stage = JobStage::Idle;
        Ok(info)
    }

    pub fn has_source(&self) -> bool {
        self.info.is_some()
    }

    pub fn media_info(&self) -> Option<&MediaInfo> {
        self.info.as_ref()
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    /// True while a job is running on the blocking task.
    pub fn is_exporting(&self) -> bool {
        self.job_task.is_some()
    }

    // Parameter mutators. Each clamps through the edit model; edits made
    // while a job is in flight apply to the next job, not the running one.

    pub fn set_trim(&mut self, start_secs: f64, end_secs: f64) {
        self.edit.set_trim(start_secs, end_secs);
    }

    pub fn set_crop(&mut self, crop: CropRect) {
        self.edit.set_crop(crop);
    }

    pub fn set_filters(&mut self, filters: FilterSettings) {
        self.edit.set_filters(filters);
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.edit.set_speed(speed);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.edit.set_volume(volume);
    }

    /// Declarative styling for the live preview surface.
    pub fn preview(&self) -> PreviewStyle {
        preview_style(&self.edit)
    }

    /// A playhead bound to the current trim window.
    pub fn playhead(&self) -> Playhead {
        Playhead::new(self.edit.trim_start, self.edit.trim_end)
    }

    /// Starts an export with the production ffmpeg encoder.
    pub fn start_export(
        &mut self,
        options: ExportOptions,
        progress: Option<ProgressCallback>,
    ) -> RecutResult<()> {
        if !ffmpeg_available() {
            return Err(RecutError::encode(
                "ffmpeg not found in PATH (required for export)",
            ));
        }
        self.start_export_with_sink(Box::new(FfmpegEncoder::new()), options, progress)
    }

    /// Starts an export into a caller-supplied sink.
    ///
    /// Snapshots the edit state, takes the source handle, and spawns the
    /// job on a blocking task. Rejected with `Busy` while a job is in
    /// flight or its result has not been collected.
    pub fn start_export_with_sink(
        &mut self,
        mut sink: Box<dyn EncoderSink>,
        options: ExportOptions,
        progress: Option<ProgressCallback>,
    ) -> RecutResult<()> {
        if self.job_task.is_some() || !self.stage.accepts_new_job() {
            return Err(RecutError::Busy);
        }
        let info = self
            .info
            .clone()
            .ok_or_else(|| RecutError::validation("No source media submitted"))?;
        let params = self
            .edit
            .snapshot_for(&info)
            .map_err(|e| RecutError::validation(e.to_string()))?;
        let mut source = self
            .source
            .take()
            .ok_or_else(|| RecutError::validation("No source media submitted"))?;

        let cancel = CancelToken::new();
        self.cancel = cancel.clone();
        self.stage = JobStage::Preparing;

        self.job_task = Some(tokio::task::spawn_blocking(move || {
            let mut job = ExportJob::new(params, options, cancel);
            let result = job.run(source.as_mut(), sink.as_mut(), progress.as_ref());
            (source, job.stage(), result)
        }));
        Ok(())
    }

    /// Waits for the in-flight job and returns its outcome.
    ///
    /// The source handle is restored for further edits however the job
    /// ended; if the task itself crashed the handle went down with it and
    /// a fresh submit is required.
    pub async fn finish_export(&mut self) -> RecutResult<ExportReceipt> {
        let task = self
            .job_task
            .take()
            .ok_or_else(|| RecutError::validation("No export in flight"))?;

        match task.await {
            Ok((source, stage, result)) => {
                self.source = Some(source);
                self.stage = stage;
                result
            }
            Err(e) => {
                // The source handle was dropped with the crashed task; the
                // session must be resubmitted a source before the next job.
                self.info = None;
                self.edit.clear_source();
                self.stage = JobStage::Failed;
                tracing::error!(error = %e, "Export task crashed");
                Err(RecutError::Other(anyhow::anyhow!(
                    "Export task failed: {e}"
                )))
            }
        }
    }

    /// Runs one export end to end.
    pub async fn export(
        &mut self,
        options: ExportOptions,
        progress: Option<ProgressCallback>,
    ) -> RecutResult<ExportReceipt> {
        self.start_export(options, progress)?;
        self.finish_export().await
    }

    /// Runs one export end to end into a caller-supplied sink.
    pub async fn export_with_sink(
        &mut self,
        sink: Box<dyn EncoderSink>,
        options: ExportOptions,
        progress: Option<ProgressCallback>,
    ) -> RecutResult<ExportReceipt> {
        self.start_export_with_sink(sink, options, progress)?;
        self.finish_export().await
    }

    /// Requests cancellation of the in-flight job.
    ///
    /// The job observes the flag between frames; the outcome arrives
    /// through `finish_export`.
    pub fn cancel_export(&self) {
        self.cancel.cancel();
    }

    /// Token observed by the current (or next) job.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Releases the source handle and the source-derived edit fields.
    ///
    /// Crop, filters, speed, and volume survive for the next source.
    pub fn discard_source(&mut self) -> RecutResult<()> {
        if self.job_task.is_some() {
            return Err(RecutError::Busy);
        }
        self.source = None;
        self.info = None;
        self.edit.clear_source();
        self.stage = JobStage::Idle;
        tracing::info!("Source discarded");
        Ok(())
    }

    /// Discards the source and restores every edit parameter to default.
    pub fn reset(&mut self) -> RecutResult<()> {
        self.discard_source()?;
        self.edit.reset();
        Ok(())
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recut_processing_core::{AudioBuffer, FrameBuffer};
    use std::path::PathBuf;

    struct StubSource {
        info: MediaInfo,
    }

    impl StubSource {
        fn new(duration_secs: f64) -> Self {
            Self {
                info: MediaInfo {
                    path: PathBuf::from("stub.mp4"),
                    duration_secs,
                    width: 64,
                    height: 36,
                    fps: 30.0,
                    audio: None,
                },
            }
        }
    }

    impl MediaSource for StubSource {
        fn info(&self) -> &MediaInfo {
            &self.info
        }

        fn seek(&mut self, _secs: f64) -> RecutResult<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> RecutResult<Option<FrameBuffer>> {
            Ok(None)
        }

        fn read_audio_slice(
            &mut self,
            _start_secs: f64,
            _duration_secs: f64,
        ) -> RecutResult<Option<AudioBuffer>> {
            Ok(None)
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = EditSession::new();
        assert!(!session.has_source());
        assert!(!session.is_exporting());
        assert_eq!(session.stage(), JobStage::Idle);
    }

    #[test]
    fn test_submit_resets_trim_to_full_window() {
        let mut session = EditSession::new();
        let info = session.submit_source(Box::new(StubSource::new(12.0))).unwrap();
        assert_eq!(info.duration_secs, 12.0);
        assert_eq!(session.edit_state().trim_start, 0.0);
        assert_eq!(session.edit_state().trim_end, 12.0);

        session.set_trim(2.0, 8.0);
        session.submit_source(Box::new(StubSource::new(5.0))).unwrap();
        assert_eq!(session.edit_state().trim_start, 0.0);
        assert_eq!(session.edit_state().trim_end, 5.0);
    }

    #[test]
    fn test_mutators_clamp_through_the_model() {
        let mut session = EditSession::new();
        session.submit_source(Box::new(StubSource::new(10.0))).unwrap();

        session.set_volume(2.0);
        assert_eq!(session.edit_state().volume, 1.0);
        session.set_speed(9.0);
        assert_eq!(session.edit_state().playback_speed, 2.0);
        session.set_trim(-3.0, 99.0);
        assert_eq!(session.edit_state().trim_start, 0.0);
        assert_eq!(session.edit_state().trim_end, 10.0);
    }

    #[test]
    fn test_preview_reflects_edit_state() {
        let mut session = EditSession::new();
        session.submit_source(Box::new(StubSource::new(10.0))).unwrap();
        session.set_filters(FilterSettings::new(120.0, 100.0, 100.0, 0.0));

        let style = session.preview();
        assert!(style.filter.contains("brightness(120%)"));

        let playhead = session.playhead();
        assert_eq!(playhead.position(), 0.0);
    }

    #[test]
    fn test_export_without_source_is_rejected() {
        let mut session = EditSession::new();
        let err = session
            .start_export_with_sink(Box::new(NullSink), ExportOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, RecutError::Validation { .. }));
    }

    #[test]
    fn test_export_with_empty_trim_window_is_rejected() {
        let mut session = EditSession::new();
        session.submit_source(Box::new(StubSource::new(10.0))).unwrap();
        session.set_trim(4.0, 4.0);

        let err = session
            .start_export_with_sink(Box::new(NullSink), ExportOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, RecutError::Validation { .. }));
        // The handle is still in place for a corrected attempt.
        assert!(session.has_source());
        assert!(!session.is_exporting());
    }

    #[test]
    fn test_discard_keeps_look_parameters() {
        let mut session = EditSession::new();
        session.submit_source(Box::new(StubSource::new(10.0))).unwrap();
        session.set_volume(0.5);
        session.set_trim(1.0, 9.0);

        session.discard_source().unwrap();
        assert!(!session.has_source());
        assert_eq!(session.edit_state().trim_end, 0.0);
        assert_eq!(session.edit_state().volume, 0.5);

        session.reset().unwrap();
        assert_eq!(session.edit_state().volume, 1.0);
    }

    #[tokio::test]
    async fn test_finish_without_start_is_rejected() {
        let mut session = EditSession::new();
        let err = session.finish_export().await.unwrap_err();
        assert!(matches!(err, RecutError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_crashed_job_task_clears_source_state() {
        let mut session = EditSession::new();
        session.submit_source(Box::new(StubSource::new(10.0))).unwrap();

        session
            .start_export_with_sink(Box::new(PanickingSink), ExportOptions::default(), None)
            .unwrap();
        let err = session.finish_export().await.unwrap_err();
        assert!(matches!(err, RecutError::Other(_)));
        assert_eq!(session.stage(), JobStage::Failed);

        // The handle went down with the task.
        assert!(!session.has_source());
        assert_eq!(session.edit_state().duration, 0.0);
        let err = session
            .start_export_with_sink(Box::new(NullSink), ExportOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, RecutError::Validation { .. }));

        session.submit_source(Box::new(StubSource::new(5.0))).unwrap();
        assert!(session.has_source());
        assert_eq!(session.stage(), JobStage::Idle);
    }

    struct NullSink;

    impl crate::encoder::EncoderSink for NullSink {
        fn start(&mut self, _settings: &crate::encoder::EncoderSettings) -> RecutResult<()> {
            Ok(())
        }

        fn write_frame(&mut self, _frame: &FrameBuffer) -> RecutResult<()> {
            Ok(())
        }

        fn finish(&mut self) -> RecutResult<u64> {
            Ok(0)
        }
    }

    struct PanickingSink;

    impl crate::encoder::EncoderSink for PanickingSink {
        fn start(&mut self, _settings: &crate::encoder::EncoderSettings) -> RecutResult<()> {
            panic!("simulated sink crash");
        }

        fn write_frame(&mut self, _frame: &FrameBuffer) -> RecutResult<()> {
            Ok(())
        }

        fn finish(&mut self) -> RecutResult<u64> {
            Ok(0)
        }
    }
}
