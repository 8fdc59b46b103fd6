//! Prometheus metrics for a capture run.
//!
//! The capture loop is single-threaded and runs no servers, so metrics are
//! exported once at the end of a run as a Prometheus text file that a node
//! exporter textfile collector can pick up.
//!
//! # Metrics Exposed
//!
//! - `critter_cam_cycles_total` - Frame pairs compared
//! - `critter_cam_detections_total` - Comparisons that found an object
//! - `critter_cam_photos_saved_total` - Photos written
//! - `critter_cam_videos_recorded_total` - Videos recorded
//! - `critter_cam_write_failures_total` - Photos/videos that failed to save
//! - `critter_cam_last_changed_pixels` - Changed-pixel count of the last comparison
//! - `critter_cam_noise_floor{channel}` - Last adaptive noise floor per channel
//! - `critter_cam_run_duration_seconds` - Wall-clock length of the run
//!
//! # Example
//!
//! ```no_run
//! use critter_cam::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     cycles: 120,
//!     detections: 4,
//!     photos_saved: 4,
//!     ..MetricsSnapshot::default()
//! };
//!
//! registry.update(&snapshot);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
