//! Recut Edit Model
//!
//! Defines the core data contracts for a Recut edit:
//! - **Crop:** Percent-space crop rectangle with pixel-region math
//! - **Filters:** Brightness/contrast/saturation/grayscale settings
//! - **Media:** Probed source metadata and intake validation
//! - **Params:** The UI-owned mutable state and its immutable per-export
//!   snapshot
//!
//! Crop coordinates are percentages of the source frame so an edit survives
//! resolution differences between preview and export.

pub mod crop;
pub mod filters;
pub mod media;
pub mod params;

pub use crop::*;
pub use filters::*;
pub use media::*;
pub use params::*;
