//! Camera capture configuration.
//!
//! The camera is fixed on the scene, so resolution stays constant for the
//! whole run. Frames of differing size can never be compared.

use crate::config::{check_seconds, clamped_seconds, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Seconds to let the sensor adjust to the light before the first frame.
    pub warmup_secs: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 1280,
            height: 720,
            fps: 30,
            warmup_secs: 2.0,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Warm-up pause as a `Duration`.
    pub fn warmup(&self) -> Duration {
        clamped_seconds(self.warmup_secs)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        check_seconds(self.warmup_secs, "warmup_secs")?;
        Ok(())
    }
}
