//! Numbered, all-or-nothing output files.

use super::{RunDirectory, WriteError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for detection output.
pub trait OutputSink {
    /// Returns the next output path for a file with `extension`.
    ///
    /// Names are unique and increase monotonically within a run; a name
    /// is consumed even if writing to it later fails.
    fn reserve_next_name(&mut self, extension: &str) -> PathBuf;

    /// Writes `bytes` to `path`. Either the complete file exists afterwards
    /// or nothing does.
    fn write_file(&mut self, bytes: &[u8], path: &Path) -> Result<(), WriteError>;

    /// Directory the sink writes into.
    fn directory(&self) -> &Path;
}

/// Writes numbered files into a run directory.
#[derive(Debug)]
pub struct FileSink {
    run_dir: RunDirectory,
    file_prefix: String,
    next: u32,
}

impl FileSink {
    /// A sink numbering files `<file_prefix>0001.<ext>` onwards.
    pub fn new(run_dir: RunDirectory, file_prefix: impl Into<String>) -> Self {
        Self {
            run_dir,
            file_prefix: file_prefix.into(),
            next: 1,
        }
    }

    /// The run directory written into.
    pub fn run_dir(&self) -> &RunDirectory {
        &self.run_dir
    }

    /// Number of names handed out so far.
    pub fn reserved(&self) -> u32 {
        self.next - 1
    }

    fn partial_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.partial", name))
    }
}

impl OutputSink for FileSink {
    fn reserve_next_name(&mut self, extension: &str) -> PathBuf {
        let name = format!("{}{:04}.{}", self.file_prefix, self.next, extension);
        self.next += 1;
        self.run_dir.path().join(name)
    }

    fn write_file(&mut self, bytes: &[u8], path: &Path) -> Result<(), WriteError> {
        if path.exists() {
            return Err(WriteError::AlreadyExists(path.to_path_buf()));
        }

        // Write beside the target, then rename into place.
        let partial = Self::partial_path(path);
        let result = File::options()
            .write(true)
            .create_new(true)
            .open(&partial)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&partial, path));

        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(WriteError::io(path, e));
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote output file");
        Ok(())
    }

    fn directory(&self) -> &Path {
        self.run_dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sink_in(root: &Path) -> FileSink {
        FileSink::new(RunDirectory::provision(root, "critters").unwrap(), "critter")
    }

    #[test]
    fn test_names_are_numbered() {
        let root = tempdir().unwrap();
        let mut sink = sink_in(root.path());

        let first = sink.reserve_next_name("jpg");
        let second = sink.reserve_next_name("h264");

        assert!(first.ends_with("critters0001/critter0001.jpg"));
        assert!(second.ends_with("critters0001/critter0002.h264"));
        assert_eq!(sink.reserved(), 2);
    }

    #[test]
    fn test_write_complete_file() {
        let root = tempdir().unwrap();
        let mut sink = sink_in(root.path());
        let path = sink.reserve_next_name("jpg");

        sink.write_file(b"photo", &path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"photo");
        let leftovers: Vec<_> = fs::read_dir(sink.directory())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let root = tempdir().unwrap();
        let mut sink = sink_in(root.path());
        let path = sink.reserve_next_name("jpg");
        fs::write(&path, b"earlier").unwrap();

        assert!(matches!(
            sink.write_file(b"later", &path),
            Err(WriteError::AlreadyExists(_))
        ));
        assert_eq!(fs::read(&path).unwrap(), b"earlier");
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let root = tempdir().unwrap();
        let mut sink = sink_in(root.path());
        let path = sink.directory().join("missing").join("critter0001.jpg");

        assert!(matches!(sink.write_file(b"photo", &path), Err(WriteError::Io { .. })));
        assert!(!path.exists());
    }
}
