//! Real camera input through `nokhwa`.

use super::mjpeg::MjpegWriter;
use super::{CameraError, CaptureConfig, Frame, FrameSource};
use crate::controller::CancelToken;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera as NokhwaCamera;
use std::path::Path;
use std::time::{Duration, Instant};

/// A physical camera, opened in streaming mode.
///
/// The stream plays the role of the preview: it is started in `open` and
/// stopped by `release_preview`.
#[derive(Default)]
pub struct DeviceCamera {
    camera: Option<NokhwaCamera>,
    sequence: u64,
    recorder: Option<MjpegWriter>,
}

impl DeviceCamera {
    /// A camera that is not opened yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn grab(camera: &mut NokhwaCamera, sequence: u64) -> Result<Frame, CameraError> {
        let buffer = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        Ok(Frame::new(decoded.into_raw(), width, height, sequence)?)
    }
}

impl FrameSource for DeviceCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
        let mut camera = NokhwaCamera::new(CameraIndex::Index(config.device_id), requested)
            .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        let actual = camera.resolution();
        tracing::info!(
            device = config.device_id,
            width = actual.width(),
            height = actual.height(),
            "Camera stream opened"
        );

        // Let exposure and white balance settle; these frames are discarded.
        let deadline = Instant::now() + config.warmup();
        while Instant::now() < deadline {
            Self::grab(&mut camera, 0)?;
        }

        self.camera = Some(camera);
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let camera = self.camera.as_mut().ok_or(CameraError::NotInitialized)?;
        self.sequence += 1;
        Self::grab(camera, self.sequence)
    }

    fn start_recording(&mut self, path: &Path) -> Result<(), CameraError> {
        if self.camera.is_none() {
            return Err(CameraError::NotInitialized);
        }
        if self.recorder.is_some() {
            return Err(CameraError::RecordingFailed("already recording".into()));
        }
        self.recorder = Some(MjpegWriter::create(path)?);
        Ok(())
    }

    fn wait_recording(&mut self, duration: Duration, cancel: &CancelToken) -> Result<(), CameraError> {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline && !cancel.is_cancelled() {
            let frame = self.capture()?;
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
        let frames = recorder.finish()?;
        tracing::debug!(frames, "Recording stopped");
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    fn recording_extension(&self) -> &'static str {
        "mjpeg"
    }

    fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    fn release_preview(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            if let Err(e) = recorder.finish() {
                tracing::warn!(error = %e, "Failed to finalize recording on release");
            }
        }
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream");
            }
            tracing::info!("Camera closed");
        }
    }
}
