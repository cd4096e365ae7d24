//! Recut Processing Core
//!
//! The pure half of the export pipeline:
//! - **Frame:** Owned RGBA8 frame buffers
//! - **Transform:** Crop extraction, nearest-neighbor resample, and the
//!   four-stage color pipeline (brightness, contrast, saturation, grayscale)
//! - **Gain:** Linear audio volume scaling
//! - **Preview:** CSS-equivalent monitoring style and trim-bound playhead
//!
//! This crate is pure computation: no I/O, no subprocesses. All inputs are
//! data; all outputs are data. Preview and export share the same transform
//! semantics so the monitor shows exactly what the encoder will see.

pub mod frame;
pub mod gain;
pub mod preview;
pub mod transform;

pub use frame::FrameBuffer;
pub use gain::{apply_gain, AudioBuffer};
pub use preview::{preview_style, Playhead, PlayheadAction, PreviewStyle};
pub use transform::{ColorPipeline, FrameTransform};
