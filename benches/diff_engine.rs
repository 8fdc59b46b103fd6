use criterion::{black_box, criterion_group, criterion_main, Criterion};
use critter_cam::capture::Frame;
use critter_cam::config::CycleConfig;
use critter_cam::detection::DiffEngine;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn frames() -> (Frame, Frame) {
    let previous = Frame::filled(WIDTH, HEIGHT, [90, 90, 90], 1);
    let mut pixels: Vec<u8> = (0..WIDTH * HEIGHT * 3).map(|i| 92 + (i % 5) as u8).collect();
    for row in 200..280 {
        for col in 300..380 {
            let i = ((row * WIDTH + col) * 3) as usize;
            pixels[i..i + 3].copy_from_slice(&[220, 180, 60]);
        }
    }
    (previous, Frame::new(pixels, WIDTH, HEIGHT, 2).unwrap())
}

fn bench_diff(c: &mut Criterion) {
    let (previous, current) = frames();
    let fixed = CycleConfig::default();
    let adaptive = CycleConfig {
        adaptive_noise_filter: true,
        ..CycleConfig::default()
    };

    c.bench_function("compute_diff 640x480", |b| {
        b.iter(|| DiffEngine::compute_diff(black_box(&previous), black_box(&current)))
    });

    let diff = DiffEngine::compute_diff(&previous, &current).unwrap();
    c.bench_function("classify 640x480 static", |b| {
        b.iter(|| DiffEngine::classify(black_box(&diff), &fixed))
    });
    c.bench_function("classify 640x480 adaptive", |b| {
        b.iter(|| DiffEngine::classify(black_box(&diff), &adaptive))
    });
}

criterion_group!(benches, bench_diff);
criterion_main!(benches);
