//! Run outcome and statistics.

use crate::capture::CameraError;
use crate::detection::DiffError;
use chrono::{DateTime, Local};
use std::fmt;

/// Why a run stopped.
#[derive(Debug)]
pub enum Termination {
    /// Interrupted by the operator.
    Cancelled,
    /// The configured number of comparisons was reached.
    Completed { cycles: u64 },
    /// The source ran out of frames (replayed footage).
    Exhausted { cycles: u64 },
    /// The source could not produce a frame.
    AcquisitionFailed(CameraError),
    /// Two frames of different size were handed to the comparison.
    ShapeMismatch(DiffError),
}

impl Termination {
    /// True for the fatal outcomes.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::AcquisitionFailed(_) | Self::ShapeMismatch(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Canceled."),
            Self::Completed { cycles } => write!(f, "Finished after {} comparisons.", cycles),
            Self::Exhausted { cycles } => {
                write!(f, "Frame source exhausted after {} comparisons.", cycles)
            }
            Self::AcquisitionFailed(e) => write!(f, "Stopped: {}", e),
            Self::ShapeMismatch(e) => write!(f, "Stopped: {}", e),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Frame pairs compared.
    pub cycles: u64,
    /// Comparisons that found an object.
    pub detections: u64,
    /// Photos written.
    pub photos_saved: u64,
    /// Videos recorded and stopped cleanly.
    pub videos_recorded: u64,
    /// Photos or videos that could not be written.
    pub write_failures: u64,
    /// Changed-pixel count of the latest comparison.
    pub last_changed_pixels: u64,
    /// Noise floor of the latest adaptive comparison.
    pub last_noise_floor: Option<[u8; 3]>,
}

/// Result of [`CaptureController::run`](super::CaptureController::run).
#[derive(Debug)]
pub struct RunReport {
    /// Why the run stopped.
    pub termination: Termination,
    /// Counters at the end of the run.
    pub stats: RunStats,
    /// Start of the run.
    pub started_at: DateTime<Local>,
    /// End of the run.
    pub finished_at: DateTime<Local>,
}

impl RunReport {
    /// Wall-clock length of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "{} cycles, {} detections, {} photos, {} videos, {} write failures in {}s",
            self.stats.cycles,
            self.stats.detections,
            self.stats.photos_saved,
            self.stats.videos_recorded,
            self.stats.write_failures,
            self.elapsed().num_seconds()
        )
    }
}
