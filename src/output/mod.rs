//! Output persistence.
//!
//! Each run gets its own numbered directory; detections inside it are
//! numbered files written all-or-nothing.

mod photo;
mod run_dir;
mod sink;

pub use photo::Photo;
pub use run_dir::RunDirectory;
pub use sink::{FileSink, OutputSink};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors persisting output.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A filesystem operation failed.
    #[error("i/o error on {}: {}", .path.display(), .source)]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The target file exists already.
    #[error("refusing to overwrite {}", .0.display())]
    AlreadyExists(PathBuf),
    /// The frame could not be encoded as a photo.
    #[error("failed to encode photo: {0}")]
    Encode(String),
    /// The source failed to record.
    #[error("failed to record video: {0}")]
    Recording(String),
    /// All numbered run directory names are taken.
    #[error("no free run directory left under {}", .0.display())]
    Exhausted(PathBuf),
}

impl WriteError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
