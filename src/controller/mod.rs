//! The capture loop.
//!
//! A small state machine drives each cycle:
//!
//! ```text
//! Init ──► Comparing ──(detected)──► Acting
//!   │        ▲   │                     │
//!   │        └───┴──── bookkeeping ◄───┘
//!   └──────────► Terminated ◄── (cancel / acquisition failure)
//! ```
//!
//! Bookkeeping moves the current frame into the previous-frame slot and
//! waits the inter-frame delay. Everything runs on the caller's thread; the
//! only blocking points are frame acquisition, the delay, and the video
//! recording wait. Frame acquisition has no timeout: a source that hangs
//! hangs the loop.

mod cancel;
mod guard;
mod report;

pub use cancel::CancelToken;
pub use guard::PreviewGuard;
pub use report::{RunReport, RunStats, Termination};

use crate::capture::{CameraError, Frame, FrameSource};
use crate::config::{ActionKind, CycleConfig};
use crate::detection::{DetectionPolicy, DetectionResult, DiffEngine};
use crate::output::{OutputSink, Photo, WriteError};
use chrono::Local;
use image::ImageFormat;
use std::time::Instant;

enum State {
    Init,
    Comparing { previous: Frame },
    Acting { current: Frame, detection: DetectionResult },
    Terminated(Termination),
}

/// Why a video could not be recorded.
enum RecordingFailure {
    /// The recording could not be written; the run goes on.
    Write(WriteError),
    /// The source stopped delivering frames mid-recording.
    Source(CameraError),
}

/// Drives acquire → compare → decide → act → advance until cancelled or
/// the source fails.
pub struct CaptureController<S, O> {
    source: S,
    sink: O,
    config: CycleConfig,
    photo_format: ImageFormat,
    max_cycles: Option<u64>,
    cancel: CancelToken,
    stats: RunStats,
}

impl<S: FrameSource, O: OutputSink> CaptureController<S, O> {
    /// Creates a controller. `source` must already be open.
    pub fn new(source: S, sink: O, config: CycleConfig, cancel: CancelToken) -> Self {
        Self {
            source,
            sink,
            config,
            photo_format: ImageFormat::Jpeg,
            max_cycles: None,
            cancel,
            stats: RunStats::default(),
        }
    }

    /// Format for photos of frames that have no original encoding.
    pub fn with_photo_format(mut self, format: ImageFormat) -> Self {
        self.photo_format = format;
        self
    }

    /// Stops the run after `max_cycles` comparisons.
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Runs the loop to completion.
    ///
    /// The source's preview is released before this returns, on every path.
    pub fn run(&mut self) -> RunReport {
        self.stats = RunStats::default();
        let started_at = Local::now();
        tracing::info!(
            threshold = self.config.threshold,
            object_size = self.config.object_size,
            adaptive = self.config.adaptive_noise_filter,
            action = ?self.config.action_kind,
            "Capture loop starting"
        );

        let termination = {
            let mut cycle = Cycle {
                source: PreviewGuard::new(&mut self.source),
                sink: &mut self.sink,
                config: &self.config,
                photo_format: self.photo_format,
                max_cycles: self.max_cycles,
                cancel: &self.cancel,
                stats: &mut self.stats,
            };
            cycle.drive()
            // `cycle` drops here, releasing the preview.
        };

        if termination.is_failure() {
            tracing::error!(%termination, "Capture loop terminated");
        } else {
            tracing::info!(%termination, "Capture loop terminated");
        }

        RunReport {
            termination,
            stats: self.stats.clone(),
            started_at,
            finished_at: Local::now(),
        }
    }

    /// Detection and action settings.
    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Statistics of the latest run.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The frame source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The output sink.
    pub fn sink(&self) -> &O {
        &self.sink
    }

    /// Gives back the source and the sink.
    pub fn into_parts(self) -> (S, O) {
        (self.source, self.sink)
    }
}

/// Borrowed state for a single run.
struct Cycle<'a, S: FrameSource, O> {
    source: PreviewGuard<'a, S>,
    sink: &'a mut O,
    config: &'a CycleConfig,
    photo_format: ImageFormat,
    max_cycles: Option<u64>,
    cancel: &'a CancelToken,
    stats: &'a mut RunStats,
}

impl<S: FrameSource, O: OutputSink> Cycle<'_, S, O> {
    fn drive(&mut self) -> Termination {
        let mut state = State::Init;
        loop {
            state = match state {
                State::Init => self.init(),
                State::Comparing { previous } => self.compare(previous),
                State::Acting { current, detection } => self.act(current, detection),
                State::Terminated(termination) => return termination,
            };
        }
    }

    fn init(&mut self) -> State {
        if self.cancel.is_cancelled() {
            return State::Terminated(Termination::Cancelled);
        }
        match self.acquire() {
            Ok(first) => State::Comparing { previous: first },
            Err(termination) => State::Terminated(termination),
        }
    }

    fn compare(&mut self, previous: Frame) -> State {
        if self.max_cycles.is_some_and(|max| self.stats.cycles >= max) {
            return State::Terminated(Termination::Completed {
                cycles: self.stats.cycles,
            });
        }
        if self.cancel.is_cancelled() {
            return State::Terminated(Termination::Cancelled);
        }

        let current = match self.acquire() {
            Ok(frame) => frame,
            Err(termination) => return State::Terminated(termination),
        };

        let start = Instant::now();
        let diff = match DiffEngine::compute_diff(&previous, &current) {
            Ok(diff) => diff,
            Err(e) => return State::Terminated(Termination::ShapeMismatch(e)),
        };
        drop(previous);

        let classification = DiffEngine::analyze(&diff, self.config);
        let detection = DetectionPolicy::decide(classification.changed_pixels, self.config);

        self.stats.cycles += 1;
        self.stats.last_changed_pixels = detection.changed_pixels();
        self.stats.last_noise_floor = classification.noise.map(|n| n.floor());

        tracing::debug!(
            cycle = self.stats.cycles,
            frame = current.sequence(),
            changed_pixels = detection.changed_pixels(),
            noise_floor = ?self.stats.last_noise_floor,
            present = detection.present(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Frame compared"
        );

        if detection.present() {
            State::Acting { current, detection }
        } else {
            self.advance(current)
        }
    }

    fn act(&mut self, current: Frame, detection: DetectionResult) -> State {
        self.stats.detections += 1;
        tracing::info!(
            frame = current.sequence(),
            changed_pixels = detection.changed_pixels(),
            "Critter detected"
        );

        match self.config.action_kind {
            ActionKind::SavePhoto => {
                match self.save_photo(&current) {
                    Ok(()) => self.stats.photos_saved += 1,
                    Err(e) => self.write_failed(e),
                }
                self.advance(current)
            }
            ActionKind::RecordVideo => {
                match self.record_video() {
                    Ok(()) => self.stats.videos_recorded += 1,
                    Err(RecordingFailure::Write(e)) => self.write_failed(e),
                    Err(RecordingFailure::Source(e)) => {
                        return State::Terminated(self.source_lost(e));
                    }
                }
                if self.cancel.is_cancelled() {
                    return State::Terminated(Termination::Cancelled);
                }
                // The frame from before the recording is stale now.
                drop(current);
                match self.acquire() {
                    Ok(fresh) => self.advance(fresh),
                    Err(termination) => State::Terminated(termination),
                }
            }
        }
    }

    /// Bookkeeping: `current` becomes the previous frame for the next cycle.
    fn advance(&mut self, current: Frame) -> State {
        if !self.cancel.sleep(self.config.inter_frame_delay()) {
            return State::Terminated(Termination::Cancelled);
        }
        State::Comparing { previous: current }
    }

    fn acquire(&mut self) -> Result<Frame, Termination> {
        self.source.capture().map_err(|e| self.source_lost(e))
    }

    fn source_lost(&self, error: CameraError) -> Termination {
        match error {
            CameraError::Exhausted => Termination::Exhausted {
                cycles: self.stats.cycles,
            },
            e => Termination::AcquisitionFailed(e),
        }
    }

    fn save_photo(&mut self, frame: &Frame) -> Result<(), WriteError> {
        let photo = Photo::from_frame(frame, self.photo_format)?;
        let path = self.sink.reserve_next_name(photo.extension);
        self.sink.write_file(&photo.bytes, &path)?;
        tracing::info!(path = %path.display(), "Saved photo");
        Ok(())
    }

    fn record_video(&mut self) -> Result<(), RecordingFailure> {
        let path = self.sink.reserve_next_name(self.source.recording_extension());
        let recording =
            |e: CameraError| RecordingFailure::Write(WriteError::Recording(e.to_string()));

        self.source.start_recording(&path).map_err(recording)?;
        tracing::info!(
            path = %path.display(),
            seconds = self.config.video_duration_secs,
            "Recording video"
        );

        let waited = self
            .source
            .wait_recording(self.config.video_duration(), self.cancel);
        // Stop even if the wait failed, so the file is finalized.
        let stopped = self.source.stop_recording();
        match waited {
            Err(e) if e.is_acquisition() => return Err(RecordingFailure::Source(e)),
            Err(e) => return Err(recording(e)),
            Ok(()) => {}
        }
        stopped.map_err(recording)?;

        tracing::info!(path = %path.display(), "Recording finished");
        Ok(())
    }

    fn write_failed(&mut self, error: WriteError) {
        self.stats.write_failures += 1;
        tracing::warn!(error = %error, "Failed to save detection; continuing");
    }
}
