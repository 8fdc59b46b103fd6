//! Detection decision.
//!
//! The object size is the one sensitivity knob operators tune: it decides
//! how many changed pixels make a critter.

use crate::config::CycleConfig;

/// Result of a single detection decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionResult {
    present: bool,
    changed_pixels: u64,
}

impl DetectionResult {
    /// Whether an object is judged to be in the scene.
    #[inline]
    pub fn present(&self) -> bool {
        self.present
    }

    /// Changed-pixel count the decision was based on.
    #[inline]
    pub fn changed_pixels(&self) -> u64 {
        self.changed_pixels
    }
}

/// Turns a changed-pixel count into a detection.
pub struct DetectionPolicy;

impl DetectionPolicy {
    /// An object is present when strictly more than `object_size` pixels
    /// changed. A count equal to the object size does not trigger.
    pub fn decide(changed_pixels: u64, config: &CycleConfig) -> DetectionResult {
        DetectionResult {
            present: changed_pixels > config.object_size,
            changed_pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_size(object_size: u64) -> CycleConfig {
        CycleConfig {
            object_size,
            ..CycleConfig::default()
        }
    }

    #[test]
    fn test_strictly_greater_triggers() {
        let result = DetectionPolicy::decide(5001, &with_size(5000));
        assert!(result.present());
        assert_eq!(result.changed_pixels(), 5001);
    }

    #[test]
    fn test_equal_count_does_not_trigger() {
        assert!(!DetectionPolicy::decide(5000, &with_size(5000)).present());
    }

    #[test]
    fn test_zero_count_never_triggers() {
        assert!(!DetectionPolicy::decide(0, &with_size(0)).present());
        assert!(DetectionPolicy::decide(1, &with_size(0)).present());
    }
}
