//! Critter Cam
//!
//! Watches a fixed scene through a camera and captures a photo or a video
//! clip whenever something ("a critter") moves into view.
//!
//! # Architecture
//!
//! Data flows strictly forward, one frame pair per cycle:
//!
//! ```text
//! capture → detection (diff → classify → decide) → controller → output
//!    ▲                                                 │
//!    └──────────── current frame becomes previous ─────┘
//! ```
//!
//! - [`capture`]: frames and the sources that produce them
//! - [`detection`]: pure frame differencing and the detection rule
//! - [`controller`]: the capture loop state machine
//! - [`output`]: run directories and all-or-nothing output files
//!
//! # Example
//!
//! ```no_run
//! use critter_cam::{
//!     capture::{CaptureConfig, FrameSource, MockCamera},
//!     config::CycleConfig,
//!     controller::{CancelToken, CaptureController},
//!     output::{FileSink, RunDirectory},
//! };
//!
//! let mut camera = MockCamera::new();
//! camera.open(&CaptureConfig::default()).unwrap();
//!
//! let run_dir = RunDirectory::provision("/tmp".as_ref(), "critters").unwrap();
//! let sink = FileSink::new(run_dir, "critter");
//!
//! let mut controller =
//!     CaptureController::new(camera, sink, CycleConfig::default(), CancelToken::new())
//!         .with_max_cycles(Some(100));
//!
//! let report = controller.run();
//! println!("{} ({})", report.termination, report.summary());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod compare;
pub mod config;
pub mod controller;
pub mod detection;
pub mod metrics;
pub mod output;

// Re-export commonly used types at crate root
pub use capture::{CameraError, Frame, FrameSource, MockCamera};
pub use config::{ActionKind, CycleConfig, FileConfig};
pub use controller::{CancelToken, CaptureController, RunReport, Termination};
pub use detection::{DetectionPolicy, DetectionResult, DiffEngine, DiffMap, NoiseProfile};
pub use output::{FileSink, OutputSink, RunDirectory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
