//! End-to-end detection on hand-built frame pairs.

use critter_cam::capture::{Frame, Shape};
use critter_cam::config::CycleConfig;
use critter_cam::detection::{DetectionPolicy, DiffEngine, DiffError};
use proptest::prelude::*;

fn config(threshold: u32, object_size: u64, adaptive: bool) -> CycleConfig {
    CycleConfig {
        threshold,
        object_size,
        adaptive_noise_filter: adaptive,
        ..CycleConfig::default()
    }
}

fn detect(previous: &Frame, current: &Frame, config: &CycleConfig) -> (u64, bool) {
    let diff = DiffEngine::compute_diff(previous, current).unwrap();
    let changed = DiffEngine::classify(&diff, config);
    (changed, DetectionPolicy::decide(changed, config).present())
}

/// 100x100 scene at value 55 (flickered up from 50) with a 10x10 block at 130.
fn flicker_with_critter() -> (Frame, Frame) {
    let previous = Frame::filled(100, 100, [50, 50, 50], 1);
    let mut pixels = vec![55u8; 100 * 100 * 3];
    for row in 45..55 {
        for col in 20..30 {
            let i = (row * 100 + col) * 3;
            pixels[i..i + 3].copy_from_slice(&[130, 130, 130]);
        }
    }
    let current = Frame::new(pixels, 100, 100, 2).unwrap();
    (previous, current)
}

#[test]
fn identical_frames_never_detect() {
    let a = Frame::filled(2, 2, [100, 100, 100], 1);
    let b = Frame::filled(2, 2, [100, 100, 100], 2);

    let diff = DiffEngine::compute_diff(&a, &b).unwrap();
    assert!(diff.is_zero());

    for (threshold, object_size) in [(0, 0), (1, 0), (30, 0), (765, 5000)] {
        for adaptive in [false, true] {
            assert_eq!(detect(&a, &b, &config(threshold, object_size, adaptive)), (0, false));
        }
    }
}

#[test]
fn single_bright_pixel_is_an_object_of_size_zero() {
    let a = Frame::filled(100, 100, [0, 0, 0], 1);
    let mut pixels = vec![0u8; 100 * 100 * 3];
    pixels[..3].copy_from_slice(&[255, 255, 255]);
    let b = Frame::new(pixels, 100, 100, 2).unwrap();

    assert_eq!(detect(&a, &b, &config(30, 0, false)), (1, true));
    assert_eq!(detect(&a, &b, &config(30, 1, false)), (1, false));
}

#[test]
fn adaptive_mode_rejects_uniform_flicker() {
    let (previous, current) = flicker_with_critter();
    let diff = DiffEngine::compute_diff(&previous, &current).unwrap();

    let adaptive = DiffEngine::analyze(&diff, &config(30, 0, true));
    assert_eq!(adaptive.changed_pixels, 100);
    // Population std of 9900 fives and 100 eighties is about 7.46.
    assert_eq!(adaptive.noise.map(|n| n.floor()), Some([7, 7, 7]));

    assert_eq!(DiffEngine::classify(&diff, &config(30, 0, false)), 100);
    assert_eq!(DiffEngine::classify(&diff, &config(5, 0, false)), 10_000);
    assert_eq!(DiffEngine::classify(&diff, &config(5, 0, true)), 100);
}

#[test]
fn flicker_alone_is_not_an_object() {
    let previous = Frame::filled(100, 100, [50, 50, 50], 1);
    let current = Frame::filled(100, 100, [55, 55, 55], 2);

    assert_eq!(detect(&previous, &current, &config(5, 50, false)), (10_000, true));
    // Uniform flicker has zero spread, so it is not filtered; it just needs
    // to stay under the threshold.
    assert_eq!(detect(&previous, &current, &config(30, 50, true)), (0, false));
}

#[test]
fn resolution_change_is_a_shape_mismatch() {
    let a = Frame::filled(640, 480, [0, 0, 0], 1);
    let b = Frame::filled(320, 240, [0, 0, 0], 2);

    assert_eq!(
        DiffEngine::compute_diff(&a, &b),
        Err(DiffError::ShapeMismatch {
            previous: Shape::new(480, 640),
            current: Shape::new(240, 320),
        })
    );
}

fn frame_pair() -> impl Strategy<Value = (Frame, Frame)> {
    (1u32..12, 1u32..12).prop_flat_map(|(width, height)| {
        let len = (width * height * 3) as usize;
        (
            prop::collection::vec(any::<u8>(), len),
            prop::collection::vec(any::<u8>(), len),
        )
            .prop_map(move |(a, b)| {
                (
                    Frame::new(a, width, height, 1).unwrap(),
                    Frame::new(b, width, height, 2).unwrap(),
                )
            })
    })
}

proptest! {
    #[test]
    fn frame_against_itself_counts_nothing(
        (frame, _) in frame_pair(),
        threshold in 0u32..800,
        adaptive in any::<bool>(),
    ) {
        let diff = DiffEngine::compute_diff(&frame, &frame).unwrap();
        prop_assert!(diff.is_zero());
        prop_assert_eq!(DiffEngine::classify(&diff, &config(threshold, 0, adaptive)), 0);
    }

    #[test]
    fn diff_is_symmetric((a, b) in frame_pair()) {
        let forward = DiffEngine::compute_diff(&a, &b).unwrap();
        let backward = DiffEngine::compute_diff(&b, &a).unwrap();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn higher_threshold_never_counts_more(
        (a, b) in frame_pair(),
        low in 0u32..800,
        step in 0u32..800,
    ) {
        let diff = DiffEngine::compute_diff(&a, &b).unwrap();
        let loose = DiffEngine::classify(&diff, &config(low, 0, false));
        let strict = DiffEngine::classify(&diff, &config(low + step, 0, false));
        prop_assert!(strict <= loose);
    }

    #[test]
    fn adaptive_never_counts_more_than_static(
        (a, b) in frame_pair(),
        threshold in 0u32..800,
    ) {
        let diff = DiffEngine::compute_diff(&a, &b).unwrap();
        let adaptive = DiffEngine::classify(&diff, &config(threshold, 0, true));
        let fixed = DiffEngine::classify(&diff, &config(threshold, 0, false));
        prop_assert!(adaptive <= fixed);
    }

    #[test]
    fn count_never_exceeds_pixels((a, b) in frame_pair(), threshold in 0u32..800) {
        let diff = DiffEngine::compute_diff(&a, &b).unwrap();
        let changed = DiffEngine::classify(&diff, &config(threshold, 0, false));
        prop_assert!(changed <= diff.shape().pixel_count() as u64);
    }

    #[test]
    fn detection_needs_strictly_more_than_object_size(
        changed in 0u64..100_000,
        object_size in 0u64..100_000,
    ) {
        let result = DetectionPolicy::decide(changed, &config(30, object_size, false));
        prop_assert_eq!(result.present(), changed > object_size);
        prop_assert_eq!(result.changed_pixels(), changed);
    }
}
