//! Frame differencing and changed-pixel counting.

use super::NoiseProfile;
use crate::capture::{Frame, Shape, CHANNELS};
use crate::config::CycleConfig;

/// Errors raised by the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The frames have different dimensions.
    #[error("cannot compare frames of shape {previous} and {current}")]
    ShapeMismatch {
        /// Shape of the earlier frame.
        previous: Shape,
        /// Shape of the later frame.
        current: Shape,
    },
}

/// Absolute per-channel change between two frames of the same shape.
///
/// Laid out exactly like the frames it was computed from.
#[derive(Clone, PartialEq, Eq)]
pub struct DiffMap {
    values: Vec<u8>,
    shape: Shape,
}

impl DiffMap {
    #[inline]
    /// Shape of the compared frames.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Interleaved per-channel differences.
    #[inline]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Per-channel difference triple at (row, col).
    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; CHANNELS]> {
        if row >= self.shape.rows || col >= self.shape.cols {
            return None;
        }
        let i = (row * self.shape.cols + col) * CHANNELS;
        Some([self.values[i], self.values[i + 1], self.values[i + 2]])
    }

    /// Summed channel difference for every pixel, row-major.
    pub fn magnitudes(&self) -> impl Iterator<Item = u32> + '_ {
        self.values
            .chunks_exact(CHANNELS)
            .map(|p| p.iter().map(|&v| v as u32).sum::<u32>())
    }

    /// True if the two frames were identical.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }
}

impl std::fmt::Debug for DiffMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffMap")
            .field("shape", &self.shape)
            .field("nonzero", &self.values.iter().filter(|&&v| v != 0).count())
            .finish()
    }
}

/// Outcome of counting changed pixels in a difference map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Pixels whose (noise-adjusted) summed change reached the threshold.
    pub changed_pixels: u64,
    /// Noise subtracted before thresholding; `None` in static mode.
    pub noise: Option<NoiseProfile>,
}

/// Computes and classifies frame differences.
pub struct DiffEngine;

impl DiffEngine {
    /// Computes `|current - previous|` per pixel and channel.
    ///
    /// Frames of differing shape are never cropped or padded; they are
    /// rejected with [`DiffError::ShapeMismatch`].
    pub fn compute_diff(previous: &Frame, current: &Frame) -> Result<DiffMap, DiffError> {
        if previous.shape() != current.shape() {
            return Err(DiffError::ShapeMismatch {
                previous: previous.shape(),
                current: current.shape(),
            });
        }

        let values = current
            .pixels()
            .iter()
            .zip(previous.pixels())
            .map(|(&c, &p)| c.abs_diff(p))
            .collect();

        Ok(DiffMap {
            values,
            shape: current.shape(),
        })
    }

    /// Counts changed pixels in `diff` under `config`.
    pub fn classify(diff: &DiffMap, config: &CycleConfig) -> u64 {
        Self::analyze(diff, config).changed_pixels
    }

    /// Like [`DiffEngine::classify`], also reporting the noise estimate used.
    ///
    /// A pixel counts as changed when the sum of its three channel
    /// differences is at least `threshold` and above zero. In adaptive mode
    /// each channel's noise floor is first subtracted (clamped at zero).
    pub fn analyze(diff: &DiffMap, config: &CycleConfig) -> Classification {
        let noise = config
            .adaptive_noise_filter
            .then(|| NoiseProfile::estimate(diff));
        let threshold = effective_threshold(config);
        let changed_pixels = adjusted_magnitudes(diff, noise.as_ref())
            .filter(|&m| m >= threshold)
            .count() as u64;

        Classification {
            changed_pixels,
            noise,
        }
    }

    /// Per-pixel changed flags, row-major, using the same rule as
    /// [`DiffEngine::classify`].
    pub fn change_mask(diff: &DiffMap, config: &CycleConfig) -> Vec<bool> {
        let noise = config
            .adaptive_noise_filter
            .then(|| NoiseProfile::estimate(diff));
        let threshold = effective_threshold(config);
        adjusted_magnitudes(diff, noise.as_ref())
            .map(|m| m >= threshold)
            .collect()
    }
}

/// An unchanged pixel never counts, even with a zero threshold.
fn effective_threshold(config: &CycleConfig) -> u32 {
    config.threshold.max(1)
}

/// Summed channel differences with the noise floor removed per channel.
fn adjusted_magnitudes<'a>(
    diff: &'a DiffMap,
    noise: Option<&NoiseProfile>,
) -> impl Iterator<Item = u32> + 'a {
    let floor = noise.map(NoiseProfile::floor).unwrap_or([0; CHANNELS]);
    diff.values().chunks_exact(CHANNELS).map(move |pixel| {
        pixel
            .iter()
            .zip(floor)
            .map(|(&v, f)| v.saturating_sub(f) as u32)
            .sum::<u32>()
    })
}
