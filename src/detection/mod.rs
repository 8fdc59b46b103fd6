//! Change detection.
//!
//! Turns a pair of frames into a yes/no "something entered the scene"
//! decision in three pure steps:
//!
//! ```text
//! compute_diff → classify (static or noise-adaptive) → decide
//! ```

mod diff;
mod noise;
mod policy;

pub use diff::{Classification, DiffEngine, DiffError, DiffMap};
pub use noise::NoiseProfile;
pub use policy::{DetectionPolicy, DetectionResult};
