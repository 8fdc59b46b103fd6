//! Motion-JPEG recording.
//!
//! A recording is a plain concatenation of JPEG images, which ffmpeg and
//! most players accept as an `mjpeg` stream.

use super::{CameraError, Frame};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const JPEG_QUALITY: u8 = 85;

/// Writes frames to an MJPEG file.
pub struct MjpegWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: u64,
}

impl MjpegWriter {
    /// Creates the output file. Fails if it already exists.
    pub fn create(path: &Path) -> Result<Self, CameraError> {
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| CameraError::RecordingFailed(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            frames: 0,
        })
    }

    /// Appends one frame, reusing its original JPEG bytes when it has them.
    pub fn append(&mut self, frame: &Frame) -> Result<(), CameraError> {
        let result = match frame.encoded() {
            Some(encoded) if encoded.format() == image::ImageFormat::Jpeg => {
                self.writer.write_all(encoded.bytes()).map_err(|e| e.to_string())
            }
            _ => JpegEncoder::new_with_quality(&mut self.writer, JPEG_QUALITY)
                .encode(
                    frame.pixels(),
                    frame.width(),
                    frame.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| e.to_string()),
        };
        result.map_err(CameraError::RecordingFailed)?;
        self.frames += 1;
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<u64, CameraError> {
        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_all())
            .map_err(|e| CameraError::RecordingFailed(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), frames = self.frames, "Recording finalized");
        Ok(self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_writes_concatenated_jpegs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("critter0001.mjpeg");

        let mut writer = MjpegWriter::create(&path).unwrap();
        writer.append(&Frame::filled(16, 8, [10, 20, 30], 1)).unwrap();
        writer.append(&Frame::filled(16, 8, [40, 50, 60], 2)).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let bytes = fs::read(&path).unwrap();
        let soi = bytes.windows(2).filter(|w| w == &[0xFF, 0xD8]).count();
        assert!(soi >= 2);
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taken.mjpeg");
        fs::write(&path, b"x").unwrap();

        assert!(matches!(
            MjpegWriter::create(&path),
            Err(CameraError::RecordingFailed(_))
        ));
    }
}
