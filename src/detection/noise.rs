//! Ambient noise estimation.
//!
//! Flickering IR lamps brighten or darken the whole scene a little from one
//! frame to the next. That shift shows up in nearly every pixel of the
//! difference map, so its spread is measured per channel over the map and
//! treated as the noise floor for that cycle.

use super::DiffMap;
use crate::capture::CHANNELS;

/// Per-channel noise estimate for one difference map.
///
/// The estimate is the population standard deviation of the channel's
/// difference values over all pixels. It is derived fresh from each map and
/// never carried across cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseProfile {
    std_dev: [f64; CHANNELS],
}

impl NoiseProfile {
    /// Estimates the noise profile of `diff`.
    pub fn estimate(diff: &DiffMap) -> Self {
        let n = diff.shape().pixel_count() as u128;
        if n == 0 {
            return Self::quiet();
        }

        let mut sum = [0u128; CHANNELS];
        let mut sum_sq = [0u128; CHANNELS];
        for pixel in diff.values().chunks_exact(CHANNELS) {
            for c in 0..CHANNELS {
                let v = pixel[c] as u128;
                sum[c] += v;
                sum_sq[c] += v * v;
            }
        }

        let mut std_dev = [0.0; CHANNELS];
        for c in 0..CHANNELS {
            // n * sum_sq >= sum^2 always holds, so this is exact and never negative.
            let numerator = n * sum_sq[c] - sum[c] * sum[c];
            std_dev[c] = (numerator as f64 / (n * n) as f64).sqrt();
        }

        Self { std_dev }
    }

    /// A profile with no noise at all.
    pub fn quiet() -> Self {
        Self {
            std_dev: [0.0; CHANNELS],
        }
    }

    /// Standard deviation per channel.
    pub fn std_dev(&self) -> [f64; CHANNELS] {
        self.std_dev
    }

    /// Integer noise floor per channel, truncated toward zero.
    pub fn floor(&self) -> [u8; CHANNELS] {
        // A u8 population has std <= 127.5, so the cast cannot saturate.
        self.std_dev.map(|s| s as u8)
    }
}
