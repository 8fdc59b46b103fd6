//! Replays a directory of still images as a frame source.
//!
//! Files are taken in lexicographic order, so `image0001.jpg`,
//! `image0002.jpg`, ... replay in capture order. Useful for tuning the
//! threshold and object size against footage captured earlier.

use super::mjpeg::MjpegWriter;
use super::{CameraError, CaptureConfig, Frame, FrameSource};
use crate::controller::CancelToken;
use image::ImageFormat;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frame source backed by image files on disk.
pub struct ImageSequenceSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    fps: u32,
    open: bool,
    sequence: u64,
    recorder: Option<MjpegWriter>,
}

impl ImageSequenceSource {
    /// A source replaying the images in `dir`. Nothing is read until `open`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending: VecDeque::new(),
            fps: 1,
            open: false,
            sequence: 0,
            recorder: None,
        }
    }

    /// Number of images not yet replayed.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| CameraError::DeviceNotFound(format!("{}: {}", dir.display(), e)))?;

        let mut images: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
            .collect();
        images.sort();
        Ok(images)
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.pending = Self::list_images(&self.dir)?.into();
        self.fps = config.fps;
        self.sequence = 0;
        self.open = true;
        tracing::info!(
            dir = %self.dir.display(),
            images = self.pending.len(),
            "Image sequence opened"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        let path = self.pending.pop_front().ok_or(CameraError::Exhausted)?;
        let bytes = fs::read(&path)
            .map_err(|e| CameraError::CaptureFailed(format!("{}: {}", path.display(), e)))?;
        self.sequence += 1;
        Ok(Frame::decode(bytes, self.sequence)?)
    }

    fn start_recording(&mut self, path: &Path) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::NotInitialized);
        }
        if self.recorder.is_some() {
            return Err(CameraError::RecordingFailed("already recording".into()));
        }
        self.recorder = Some(MjpegWriter::create(path)?);
        Ok(())
    }

    /// Replays the images that fall inside `duration` at the configured
    /// frame rate into the recording.
    fn wait_recording(&mut self, duration: Duration, cancel: &CancelToken) -> Result<(), CameraError> {
        let frames = (duration.as_secs_f64() * self.fps as f64).ceil() as u64;
        for _ in 0..frames {
            if cancel.is_cancelled() {
                break;
            }
            let frame = match self.capture() {
                Ok(frame) => frame,
                Err(CameraError::Exhausted) => break,
                Err(e) => return Err(e),
            };
            self.recorder
                .as_mut()
                .ok_or_else(|| CameraError::RecordingFailed("not recording".into()))?
                .append(&frame)?;
        }
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CameraError> {
        let recorder = self
            .recorder
            .take()
            .ok_or_else(|| CameraError::RecordingFailed("not recording".into()))?;
        recorder.finish().map(|_| ())
    }

    fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    fn recording_extension(&self) -> &'static str {
        "mjpeg"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn release_preview(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            if let Err(e) = recorder.finish() {
                tracing::warn!(error = %e, "Failed to finalize recording on release");
            }
        }
        self.open = false;
        tracing::info!(dir = %self.dir.display(), "Image sequence closed");
    }
}
