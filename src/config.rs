//! Run configuration.
//!
//! Every tunable lives in an immutable value handed to the components that
//! need it; nothing is process-global. The TOML file mirrors these structs:
//!
//! ```toml
//! [capture]
//! width = 1280
//! height = 720
//!
//! [cycle]
//! threshold = 50
//! object_size = 2000
//! adaptive_noise_filter = true
//! action_kind = "record_video"
//! video_duration_secs = 10.0
//!
//! [output]
//! run_prefix = "critters"
//! ```

use crate::capture::CaptureConfig;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when a critter is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Keep the frame that triggered the detection.
    #[default]
    SavePhoto,
    /// Record a video clip of fixed length.
    RecordVideo,
}

/// Detection and action settings for the capture loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Minimum summed RGB change for a pixel to count as changed.
    pub threshold: u32,
    /// A detection needs strictly more changed pixels than this.
    pub object_size: u64,
    /// Subtract the per-channel noise floor before thresholding.
    pub adaptive_noise_filter: bool,
    /// Pause between cycles, in seconds. Processing time is not included.
    pub inter_frame_delay_secs: f64,
    /// What to do on a detection.
    pub action_kind: ActionKind,
    /// Clip length in seconds; only used with `RecordVideo`.
    pub video_duration_secs: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            threshold: 30,
            object_size: 5000,
            adaptive_noise_filter: false,
            inter_frame_delay_secs: 0.0,
            action_kind: ActionKind::SavePhoto,
            video_duration_secs: 10.0,
        }
    }
}

/// Longest accepted delay, clip or warm-up: one day.
pub const MAX_DURATION_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Checks a seconds setting against [`MAX_DURATION_SECS`].
pub(crate) fn check_seconds(secs: f64, field: &'static str) -> Result<Duration, ConfigError> {
    if !(0.0..=MAX_DURATION_SECS).contains(&secs) {
        return Err(ConfigError::InvalidDuration(field));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Converts a seconds setting, clamping anything out of range.
pub(crate) fn clamped_seconds(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_DURATION_SECS))
}

impl CycleConfig {
    /// Pause between cycles.
    pub fn inter_frame_delay(&self) -> Duration {
        clamped_seconds(self.inter_frame_delay_secs)
    }

    /// Length of a recorded clip.
    pub fn video_duration(&self) -> Duration {
        clamped_seconds(self.video_duration_secs)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_seconds(self.inter_frame_delay_secs, "inter_frame_delay_secs")?;
        let video = check_seconds(self.video_duration_secs, "video_duration_secs")?;
        if self.action_kind == ActionKind::RecordVideo && video.is_zero() {
            return Err(ConfigError::InvalidDuration("video_duration_secs"));
        }
        Ok(())
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives the run directories. Defaults to `$HOME`.
    pub root: Option<PathBuf>,
    /// Run directories are named `<run_prefix>0001`, `<run_prefix>0002`, ...
    pub run_prefix: String,
    /// Output files are named `<file_prefix>0001.<ext>`, ...
    pub file_prefix: String,
    /// Format for photos that have no original encoding to copy.
    pub photo_extension: String,
    /// Stop after this many comparisons (run until cancelled if absent).
    pub max_cycles: Option<u64>,
    /// Write `metrics.prom` into the run directory at the end of the run.
    pub write_metrics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            run_prefix: "critters".into(),
            file_prefix: "critter".into(),
            photo_extension: "jpg".into(),
            max_cycles: None,
            write_metrics: true,
        }
    }
}

impl OutputConfig {
    /// Root directory with the `$HOME` / current-directory fallback applied.
    pub fn resolved_root(&self) -> PathBuf {
        self.root
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Image format used when a photo has to be encoded.
    pub fn photo_format(&self) -> Result<ImageFormat, ConfigError> {
        ImageFormat::from_extension(&self.photo_extension)
            .ok_or_else(|| ConfigError::UnknownPhotoFormat(self.photo_extension.clone()))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_prefix.is_empty() || self.run_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(ConfigError::InvalidName(self.run_prefix.clone()));
        }
        if self.file_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(ConfigError::InvalidName(self.file_prefix.clone()));
        }
        self.photo_format().map(|_| ())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate is zero or above 120.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// A duration setting is negative, not finite, or too large.
    #[error("invalid duration for {0} (must be finite and non-negative)")]
    InvalidDuration(&'static str),
    /// The photo extension names no known image format.
    #[error("unsupported photo format: {0}")]
    UnknownPhotoFormat(String),
    /// A directory or file prefix is unusable.
    #[error("invalid name prefix: {0:?}")]
    InvalidName(String),
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    /// Camera settings.
    pub capture: CaptureConfig,
    #[serde(default)]
    /// Detection and action settings.
    pub cycle: CycleConfig,
    #[serde(default)]
    /// Output location and naming.
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.cycle.validate()?;
        self.output.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_field_settings() {
        let config = CycleConfig::default();
        assert_eq!(config.threshold, 30);
        assert_eq!(config.object_size, 5000);
        assert!(!config.adaptive_noise_filter);
        assert_eq!(config.inter_frame_delay(), Duration::ZERO);
        assert_eq!(config.action_kind, ActionKind::SavePhoto);
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = FileConfig::from_toml(
            r#"
            [cycle]
            threshold = 50
            object_size = 2000
            adaptive_noise_filter = true
            action_kind = "record_video"
            video_duration_secs = 10.0

            [output]
            max_cycles = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.cycle.threshold, 50);
        assert_eq!(config.cycle.object_size, 2000);
        assert_eq!(config.cycle.action_kind, ActionKind::RecordVideo);
        assert_eq!(config.cycle.video_duration(), Duration::from_secs(10));
        assert_eq!(config.output.max_cycles, Some(25));
        assert_eq!(config.output.run_prefix, "critters");
        assert_eq!(config.capture.width, 1280);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let config = CycleConfig {
            inter_frame_delay_secs: -0.5,
            ..CycleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration("inter_frame_delay_secs"))
        ));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        for secs in [1e30, f64::INFINITY, f64::NAN, MAX_DURATION_SECS + 1.0] {
            let delay = CycleConfig {
                inter_frame_delay_secs: secs,
                ..CycleConfig::default()
            };
            assert!(matches!(
                delay.validate(),
                Err(ConfigError::InvalidDuration("inter_frame_delay_secs"))
            ));
            // Unvalidated values clamp instead of panicking.
            assert!(delay.inter_frame_delay() <= Duration::from_secs_f64(MAX_DURATION_SECS));

            let video = CycleConfig {
                action_kind: ActionKind::RecordVideo,
                video_duration_secs: secs,
                ..CycleConfig::default()
            };
            assert!(matches!(
                video.validate(),
                Err(ConfigError::InvalidDuration("video_duration_secs"))
            ));
            assert!(video.video_duration() <= Duration::from_secs_f64(MAX_DURATION_SECS));
        }

        let longest = CycleConfig {
            inter_frame_delay_secs: MAX_DURATION_SECS,
            ..CycleConfig::default()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_zero_video_duration_rejected_only_for_video() {
        let mut config = CycleConfig {
            video_duration_secs: 0.0,
            ..CycleConfig::default()
        };
        assert!(config.validate().is_ok());

        config.action_kind = ActionKind::RecordVideo;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_photo_format() {
        let output = OutputConfig {
            photo_extension: "doc".into(),
            ..OutputConfig::default()
        };
        assert!(matches!(
            output.validate(),
            Err(ConfigError::UnknownPhotoFormat(_))
        ));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            FileConfig::from_toml("[cycle]\nthreshold = \"lots\""),
            Err(ConfigError::ParseError(_))
        ));
    }
}
