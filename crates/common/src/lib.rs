//! Recut Common Utilities
//!
//! Shared infrastructure for all Recut crates:
//! - Error types and result aliases
//! - Frame cadence and pacing utilities
//! - Tracing/logging initialization

pub mod clock;
pub mod error;
pub mod logging;

pub use clock::*;
pub use error::*;
pub use logging::*;
