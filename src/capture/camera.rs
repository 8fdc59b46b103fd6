//! Frame source abstraction.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::{CaptureConfig, Frame, FrameError};
use crate::controller::CancelToken;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during frame source operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No camera matches the configured device.
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    /// The device exists but could not be opened.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// The capture settings were rejected.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// Reading a frame failed.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// The source produced data that is not a valid frame.
    #[error("camera produced an invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
    /// A finite source has no frames left.
    #[error("frame source exhausted")]
    Exhausted,
    /// Starting, writing or finalizing a recording failed.
    #[error("recording failed: {0}")]
    RecordingFailed(String),
    /// The source has not been opened.
    #[error("camera not initialized")]
    NotInitialized,
}

impl CameraError {
    /// True if the source failed to deliver a frame, as opposed to failing
    /// to write a recording.
    pub fn is_acquisition(&self) -> bool {
        !matches!(self, Self::RecordingFailed(_))
    }
}

/// Trait for anything that can hand out frames and record video.
///
/// All calls block. `release_preview` must be safe to call more than once
/// and must also stop a recording that is still running.
pub trait FrameSource {
    /// Opens and initializes the source with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Starts recording video to `path`.
    fn start_recording(&mut self, path: &Path) -> Result<(), CameraError>;

    /// Blocks while the recording runs.
    ///
    /// Returns early if `cancel` fires; the caller still has to stop the
    /// recording. Frames that cannot be read are reported with their
    /// capture error; only failures writing the recording itself are
    /// `RecordingFailed`.
    fn wait_recording(&mut self, duration: Duration, cancel: &CancelToken) -> Result<(), CameraError> {
        cancel.sleep(duration);
        Ok(())
    }

    /// Stops the current recording and finalizes the file.
    fn stop_recording(&mut self) -> Result<(), CameraError>;

    /// Checks if a recording is in progress.
    fn is_recording(&self) -> bool;

    /// File extension of the recordings this source produces.
    fn recording_extension(&self) -> &'static str;

    /// Checks if the source is currently open.
    fn is_open(&self) -> bool;

    /// Stops preview and any in-progress recording, releasing the device.
    fn release_preview(&mut self);
}

/// Mock camera for testing.
///
/// Either replays a fixed script of frames or, by default, synthesizes a
/// flickering grey scene where a bright block wanders in every few frames.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    script: Option<VecDeque<Frame>>,
    /// Fail with `CaptureFailed` once this many frames have been produced.
    fail_after: Option<u64>,
    recording: Option<PathBuf>,
    recordings: Vec<PathBuf>,
    releases: u32,
}

impl MockCamera {
    /// A camera producing the synthetic scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera that returns `frames` in order, then reports `Exhausted`.
    pub fn scripted(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            script: Some(frames.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Makes every capture after the first `frames` fail.
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Paths of all finished recordings, oldest first.
    pub fn recordings(&self) -> &[PathBuf] {
        &self.recordings
    }

    /// Number of times the preview has been released.
    pub fn release_count(&self) -> u32 {
        self.releases
    }

    /// Number of frames handed out so far.
    pub fn frames_captured(&self) -> u64 {
        self.sequence
    }
}

fn synthesize(config: &CaptureConfig, sequence: u64) -> Result<Frame, CameraError> {
    let (width, height) = (config.width, config.height);
    // IR-lamp style flicker: the whole scene brightens on odd frames.
    let base = 90 + (sequence % 2) as u8 * 4;
    let mut pixels = vec![base; (width * height) as usize * 3];

    if sequence > 0 && sequence % 5 == 0 {
        let block_w = (width / 8).max(1);
        let block_h = (height / 8).max(1);
        let x0 = ((sequence / 5) * block_w as u64 % width as u64) as u32;
        let y0 = height / 2 - block_h / 2;
        for y in y0..(y0 + block_h).min(height) {
            for x in x0..(x0 + block_w).min(width) {
                let i = ((y * width + x) * 3) as usize;
                pixels[i..i + 3].copy_from_slice(&[220, 180, 60]);
            }
        }
    }

    Ok(Frame::new(pixels, width, height, sequence + 1)?)
}

impl FrameSource for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;

        if self.fail_after.is_some_and(|limit| self.sequence >= limit) {
            return Err(CameraError::CaptureFailed("mock failure".into()));
        }

        let frame = match self.script.as_mut() {
            Some(script) => script.pop_front().ok_or(CameraError::Exhausted)?,
            None => synthesize(config, self.sequence)?,
        };

        self.sequence += 1;
        Ok(frame)
    }

    fn start_recording(&mut self, path: &Path) -> Result<(), CameraError> {
        if self.config.is_none() {
            return Err(CameraError::NotInitialized);
        }
        if let Some(active) = &self.recording {
            return Err(CameraError::RecordingFailed(format!(
                "already recording to {}",
                active.display()
            )));
        }
        self.recording = Some(path.to_path_buf());
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CameraError> {
        let path = self
            .recording
            .take()
            .ok_or_else(|| CameraError::RecordingFailed("not recording".into()))?;
        self.recordings.push(path);
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn recording_extension(&self) -> &'static str {
        "h264"
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn release_preview(&mut self) {
        if self.recording.is_some() {
            let _ = self.stop_recording();
        }
        self.config = None;
        self.releases += 1;
        tracing::info!("MockCamera closed");
    }
}
