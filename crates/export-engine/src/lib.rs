//! Recut Export Engine
//!
//! Frame-synchronous export pipeline that replays the trimmed window of a
//! source asset through the crop/filter transform and muxes the result,
//! with gain-adjusted audio, into a timestamped artifact.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source.mp4 ──► probe ──► seek(trim start)
//!                               │
//!                     Pacer (native fps over
//!                    [trim start, trim end))
//!                               │
//!                      Frame Transform                audio slice
//!                      (crop + filters)                    │
//!                               │                     gain  ▼
//!                               ▼                    temp WAV ──┐
//!                      Encoder / Muxer  ◄──────────────────────┘
//!                    (raw RGBA on stdin)
//!                               │
//!                               ▼
//!                 edited-video-<timestamp>.webm
//! ```
//!
//! The [`EditSession`] facade owns the source handle and edit state and
//! runs jobs on a blocking task; [`export_edit`] is the underlying
//! one-call blocking entry.

pub mod encoder;
pub mod job;
pub mod pacer;
pub mod session;
pub mod source;

pub use encoder::{EncoderSettings, EncoderSink, ExportFormat, FfmpegEncoder};
pub use job::{
    export_edit, CancelToken, ExportJob, ExportOptions, ExportProgress, ExportReceipt, JobStage,
    ProgressCallback,
};
pub use pacer::{Pacer, Pacing, SampleInstant};
pub use session::EditSession;
pub use source::{ffmpeg_available, FfmpegSource, MediaSource};
