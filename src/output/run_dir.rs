//! Per-run output directories.

use super::WriteError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A freshly created directory that holds one run's output.
///
/// Directories are numbered `<prefix>0001`, `<prefix>0002`, ... under a
/// root; provisioning takes the first number with nothing on disk yet, so
/// an earlier run's directory is never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
    number: u32,
}

impl RunDirectory {
    /// Creates the next unused run directory under `root`.
    ///
    /// `root` is created if missing. The returned path is absolute.
    pub fn provision(root: &Path, prefix: &str) -> Result<Self, WriteError> {
        fs::create_dir_all(root).map_err(|e| WriteError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| WriteError::io(root, e))?;

        for number in 1..=u32::MAX {
            let path = root.join(format!("{}{:04}", prefix, number));
            // create_dir fails on anything already there, which makes the
            // existence check and the claim a single step.
            match fs::create_dir(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "Created run directory");
                    return Ok(Self { path, number });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(WriteError::io(&path, e)),
            }
        }

        Err(WriteError::Exhausted(root))
    }

    /// Absolute path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number in the directory name.
    pub fn number(&self) -> u32 {
        self.number
    }
}
