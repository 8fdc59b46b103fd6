//! One-off comparison of two still images.
//!
//! Runs the same detection as the capture loop on a pair of files, which is
//! how threshold and object size are tuned by hand. The highlight image
//! keeps the second image's pixels where they count as changed and paints
//! everything else black, so the detected object stands out.

use crate::capture::{Frame, FrameError};
use crate::config::CycleConfig;
use crate::detection::{Classification, DetectionPolicy, DetectionResult, DiffEngine, DiffError};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors comparing image files.
#[derive(Debug, Error)]
pub enum CompareError {
    /// An image file could not be read.
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// An image file could not be decoded.
    #[error("failed to decode {}: {}", .path.display(), .source)]
    Decode {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: FrameError,
    },
    /// The images differ in size.
    #[error(transparent)]
    Diff(#[from] DiffError),
}

/// Detection outcome for a pair of images.
#[derive(Debug)]
pub struct Comparison {
    current: Frame,
    mask: Vec<bool>,
    classification: Classification,
    detection: DetectionResult,
}

impl Comparison {
    /// Compares two frames with the detection rules in `config`.
    pub fn of_frames(previous: &Frame, current: Frame, config: &CycleConfig) -> Result<Self, DiffError> {
        let diff = DiffEngine::compute_diff(previous, &current)?;
        let classification = DiffEngine::analyze(&diff, config);
        let detection = DetectionPolicy::decide(classification.changed_pixels, config);
        let mask = DiffEngine::change_mask(&diff, config);

        Ok(Self {
            current,
            mask,
            classification,
            detection,
        })
    }

    /// Loads and compares two image files.
    pub fn of_files(previous: &Path, current: &Path, config: &CycleConfig) -> Result<Self, CompareError> {
        let previous = load(previous, 1)?;
        let current = load(current, 2)?;
        Ok(Self::of_frames(&previous, current, config)?)
    }

    /// Number of pixels counted as changed.
    pub fn changed_pixels(&self) -> u64 {
        self.detection.changed_pixels()
    }

    /// True if an object appears in the second image.
    pub fn present(&self) -> bool {
        self.detection.present()
    }

    /// Changed count and noise estimate.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// The second image with unchanged pixels blacked out.
    pub fn highlight(&self) -> RgbImage {
        let mut image = self.current.to_rgb_image();
        let width = image.width() as usize;
        for (i, changed) in self.mask.iter().enumerate() {
            if !changed {
                image.put_pixel((i % width) as u32, (i / width) as u32, Rgb([0, 0, 0]));
            }
        }
        image
    }
}

fn load(path: &Path, sequence: u64) -> Result<Frame, CompareError> {
    let bytes = std::fs::read(path).map_err(|source| CompareError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Frame::decode(bytes, sequence).map_err(|source| CompareError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_highlight_keeps_changed_pixels() {
        let previous = Frame::filled(2, 2, [0, 0, 0], 1);
        let mut pixels = vec![5u8; 12];
        pixels[3..6].copy_from_slice(&[200, 100, 50]);
        let current = Frame::new(pixels, 2, 2, 2).unwrap();

        let config = CycleConfig {
            threshold: 30,
            object_size: 0,
            ..CycleConfig::default()
        };
        let comparison = Comparison::of_frames(&previous, current, &config).unwrap();

        assert_eq!(comparison.changed_pixels(), 1);
        assert!(comparison.present());

        let highlight = comparison.highlight();
        assert_eq!(highlight.get_pixel(1, 0).0, [200, 100, 50]);
        assert_eq!(highlight.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(highlight.get_pixel(1, 1).0, [0, 0, 0]);
    }

    #[test]
    fn test_of_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbImage::from_pixel(10, 10, Rgb([20, 20, 20])).save(&a).unwrap();
        let mut changed = RgbImage::from_pixel(10, 10, Rgb([20, 20, 20]));
        for x in 0..5 {
            changed.put_pixel(x, 0, Rgb([250, 250, 250]));
        }
        changed.save(&b).unwrap();

        let config = CycleConfig {
            object_size: 4,
            ..CycleConfig::default()
        };
        let comparison = Comparison::of_files(&a, &b, &config).unwrap();
        assert_eq!(comparison.changed_pixels(), 5);
        assert!(comparison.present());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        assert!(matches!(
            Comparison::of_files(&missing, &missing, &CycleConfig::default()),
            Err(CompareError::Read { .. })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let previous = Frame::filled(2, 2, [0, 0, 0], 1);
        let current = Frame::filled(3, 2, [0, 0, 0], 2);
        assert!(Comparison::of_frames(&previous, current, &CycleConfig::default()).is_err());
    }
}
