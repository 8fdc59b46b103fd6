//! Metrics collection and registry.

use crate::controller::RunReport;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::path::Path;
use thiserror::Error;

const CHANNEL_NAMES: [&str; 3] = ["red", "green", "blue"];

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a metric failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// The metrics file could not be written.
    #[error("failed to write metrics file: {0}")]
    Io(#[from] std::io::Error),
}

/// A snapshot of run state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frame pairs compared.
    pub cycles: u64,
    /// Comparisons that found an object.
    pub detections: u64,
    /// Photos written.
    pub photos_saved: u64,
    /// Videos recorded.
    pub videos_recorded: u64,
    /// Photos or videos that failed to save.
    pub write_failures: u64,
    /// Changed-pixel count of the last comparison.
    pub last_changed_pixels: u64,
    /// Per-channel noise floor, present only in adaptive mode.
    pub noise_floor: Option<[u8; 3]>,
    /// Wall-clock length of the run.
    pub run_duration_secs: f64,
}

impl MetricsSnapshot {
    /// Creates a snapshot from a finished run.
    pub fn from_report(report: &RunReport) -> Self {
        let stats = &report.stats;
        Self {
            cycles: stats.cycles,
            detections: stats.detections,
            photos_saved: stats.photos_saved,
            videos_recorded: stats.videos_recorded,
            write_failures: stats.write_failures,
            last_changed_pixels: stats.last_changed_pixels,
            noise_floor: stats.last_noise_floor,
            run_duration_secs: report.elapsed().num_milliseconds() as f64 / 1000.0,
        }
    }
}

/// Prometheus metrics registry for capture runs.
pub struct MetricsRegistry {
    registry: Registry,

    cycles_total: IntCounter,
    detections_total: IntCounter,
    photos_saved_total: IntCounter,
    videos_recorded_total: IntCounter,
    write_failures_total: IntCounter,

    last_changed_pixels: IntGauge,
    noise_floor: IntGaugeVec,
    run_duration_seconds: Gauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all run metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let cycles_total =
            IntCounter::new("critter_cam_cycles_total", "Total frame pairs compared")?;
        let detections_total = IntCounter::new(
            "critter_cam_detections_total",
            "Comparisons that detected an object",
        )?;
        let photos_saved_total =
            IntCounter::new("critter_cam_photos_saved_total", "Photos written to disk")?;
        let videos_recorded_total =
            IntCounter::new("critter_cam_videos_recorded_total", "Videos recorded")?;
        let write_failures_total = IntCounter::new(
            "critter_cam_write_failures_total",
            "Photos or videos that could not be saved",
        )?;

        let last_changed_pixels = IntGauge::new(
            "critter_cam_last_changed_pixels",
            "Changed-pixel count of the most recent comparison",
        )?;
        let noise_floor = IntGaugeVec::new(
            Opts::new(
                "critter_cam_noise_floor",
                "Most recent adaptive noise floor per colour channel",
            ),
            &["channel"],
        )?;
        let run_duration_seconds = Gauge::new(
            "critter_cam_run_duration_seconds",
            "Wall-clock duration of the run",
        )?;

        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(detections_total.clone()))?;
        registry.register(Box::new(photos_saved_total.clone()))?;
        registry.register(Box::new(videos_recorded_total.clone()))?;
        registry.register(Box::new(write_failures_total.clone()))?;
        registry.register(Box::new(last_changed_pixels.clone()))?;
        registry.register(Box::new(noise_floor.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            detections_total,
            photos_saved_total,
            videos_recorded_total,
            write_failures_total,
            last_changed_pixels,
            noise_floor,
            run_duration_seconds,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // Counters only move forward; add the difference.
        fn catch_up(counter: &IntCounter, target: u64) {
            let current = counter.get();
            if target > current {
                counter.inc_by(target - current);
            }
        }

        catch_up(&self.cycles_total, snapshot.cycles);
        catch_up(&self.detections_total, snapshot.detections);
        catch_up(&self.photos_saved_total, snapshot.photos_saved);
        catch_up(&self.videos_recorded_total, snapshot.videos_recorded);
        catch_up(&self.write_failures_total, snapshot.write_failures);

        self.last_changed_pixels.set(snapshot.last_changed_pixels as i64);
        if let Some(floor) = snapshot.noise_floor {
            for (name, value) in CHANNEL_NAMES.into_iter().zip(floor) {
                self.noise_floor.with_label_values(&[name]).set(value as i64);
            }
        }
        self.run_duration_seconds.set(snapshot.run_duration_secs);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Writes the encoded metrics to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), MetricsError> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }
}
