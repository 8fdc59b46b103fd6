//! Critter Cam CLI
//!
//! `critter-cam run` watches the scene until interrupted with Ctrl+C;
//! `critter-cam compare` checks a single pair of images.

use clap::{Args, Parser, Subcommand};
use critter_cam::{
    capture::{FrameSource, ImageSequenceSource, MockCamera},
    compare::Comparison,
    config::{ActionKind, ConfigError, CycleConfig, FileConfig},
    controller::{CancelToken, CaptureController},
    metrics::{MetricsRegistry, MetricsSnapshot},
    output::{FileSink, RunDirectory},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{info, warn};

#[cfg(feature = "camera")]
const DEFAULT_SOURCE: &str = "camera";
#[cfg(not(feature = "camera"))]
const DEFAULT_SOURCE: &str = "mock";

/// Default object size for `compare`. Stills are usually taken at full
/// resolution, so a critter covers more pixels than in the live feed.
const COMPARE_OBJECT_SIZE: u64 = 25_000;

#[derive(Parser)]
#[command(name = "critter-cam", version, about = "Capture critters that wander into view")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the scene and save a photo or video whenever something appears
    Run(RunArgs),
    /// Compare two image files and report whether an object appeared
    Compare(CompareArgs),
}

/// Detection settings shared by both subcommands.
#[derive(Args)]
struct DetectionArgs {
    /// Minimum summed RGB change for a pixel to count as changed
    #[arg(long)]
    threshold: Option<u32>,
    /// Changed pixels needed (strictly more than this) to detect an object
    /// [default: 5000 for `run`, 25000 for `compare`]
    #[arg(long)]
    object_size: Option<u64>,
    /// Subtract per-channel flicker noise before thresholding
    #[arg(long)]
    adaptive: bool,
}

#[derive(Args)]
struct RunArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Frame source: `camera`, `mock`, or `dir:<path>` to replay images
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: SourceKind,
    #[command(flatten)]
    detection: DetectionArgs,
    /// Seconds to wait between photos
    #[arg(long)]
    delay: Option<f64>,
    /// Record a video of this many seconds instead of saving a photo
    #[arg(long, value_name = "SECS")]
    video: Option<f64>,
    /// Stop after this many comparisons
    #[arg(long)]
    max_cycles: Option<u64>,
    /// Directory in which the run directory is created
    #[arg(long)]
    output_root: Option<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    /// Earlier image
    previous: PathBuf,
    /// Later image
    current: PathBuf,
    #[command(flatten)]
    detection: DetectionArgs,
    /// Write the changed pixels of the later image (rest black) here
    #[arg(long)]
    highlight: Option<PathBuf>,
}

#[derive(Debug, Clone)]
enum SourceKind {
    Camera,
    Mock,
    Directory(PathBuf),
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera" => Ok(Self::Camera),
            "mock" => Ok(Self::Mock),
            _ => s
                .strip_prefix("dir:")
                .filter(|path| !path.is_empty())
                .map(|path| Self::Directory(PathBuf::from(path)))
                .ok_or_else(|| format!("unknown source {:?} (expected camera, mock or dir:<path>)", s)),
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::Compare(args) => compare(args),
    }
}

fn load_config(args: &RunArgs) -> Result<FileConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    let cycle = &mut config.cycle;
    if let Some(threshold) = args.detection.threshold {
        cycle.threshold = threshold;
    }
    if let Some(object_size) = args.detection.object_size {
        cycle.object_size = object_size;
    }
    if args.detection.adaptive {
        cycle.adaptive_noise_filter = true;
    }
    if let Some(delay) = args.delay {
        cycle.inter_frame_delay_secs = delay;
    }
    if let Some(seconds) = args.video {
        cycle.action_kind = ActionKind::RecordVideo;
        cycle.video_duration_secs = seconds;
    }
    if args.max_cycles.is_some() {
        config.output.max_cycles = args.max_cycles;
    }
    if args.output_root.is_some() {
        config.output.root = args.output_root.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run(args: RunArgs) -> ExitCode {
    info!("Critter Cam v{}", critter_cam::VERSION);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_ctrlc_handler() {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    match args.source {
        SourceKind::Mock => {
            info!("Using synthetic mock camera input");
            run_with(MockCamera::new(), config, cancel)
        }
        SourceKind::Directory(dir) => run_with(ImageSequenceSource::new(dir), config, cancel),
        SourceKind::Camera => run_camera(config, cancel),
    }
}

#[cfg(feature = "camera")]
fn run_camera(config: FileConfig, cancel: CancelToken) -> ExitCode {
    run_with(critter_cam::capture::DeviceCamera::new(), config, cancel)
}

#[cfg(not(feature = "camera"))]
fn run_camera(_config: FileConfig, _cancel: CancelToken) -> ExitCode {
    eprintln!("This build has no camera support; rebuild with `--features camera`.");
    ExitCode::FAILURE
}

fn run_with<S: FrameSource>(mut source: S, config: FileConfig, cancel: CancelToken) -> ExitCode {
    let photo_format = match config.output.photo_format() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = source.open(&config.capture) {
        eprintln!("Failed to open frame source: {}", e);
        return ExitCode::FAILURE;
    }

    let run_dir = match RunDirectory::provision(&config.output.resolved_root(), &config.output.run_prefix) {
        Ok(dir) => dir,
        Err(e) => {
            source.release_preview();
            eprintln!("Could not create run directory: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Saving detections to {}", run_dir.path().display());
    let metrics_path = run_dir.path().join("metrics.prom");

    let sink = FileSink::new(run_dir, config.output.file_prefix.clone());
    let mut controller = CaptureController::new(source, sink, config.cycle.clone(), cancel)
        .with_photo_format(photo_format)
        .with_max_cycles(config.output.max_cycles);

    let report = controller.run();
    info!("Run summary: {}", report.summary());

    if config.output.write_metrics {
        let written = MetricsRegistry::new().and_then(|registry| {
            registry.update(&MetricsSnapshot::from_report(&report));
            registry.write_to(&metrics_path)
        });
        if let Err(e) = written {
            warn!("Failed to write metrics: {}", e);
        }
    }

    println!("{}", report.termination);
    if report.termination.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn compare_config(detection: &DetectionArgs) -> CycleConfig {
    let mut config = FileConfig::default().cycle;
    config.object_size = detection.object_size.unwrap_or(COMPARE_OBJECT_SIZE);
    if let Some(threshold) = detection.threshold {
        config.threshold = threshold;
    }
    config.adaptive_noise_filter = detection.adaptive;
    config
}

fn compare(args: CompareArgs) -> ExitCode {
    let config = compare_config(&args.detection);
    let comparison = match Comparison::of_files(&args.previous, &args.current, &config) {
        Ok(comparison) => comparison,
        Err(e) => {
            eprintln!("Comparison failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.highlight {
        if let Err(e) = comparison.highlight().save(path) {
            eprintln!("Failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote highlight image to {}", path.display());
    }

    println!(
        "There are {} pixels that are different in the two files.",
        comparison.changed_pixels()
    );
    if comparison.present() {
        println!("There seems to be an object in the second file.");
    } else {
        println!("There is probably NO object in the second file.");
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use critter_cam::capture::CaptureConfig;
    use std::fs;
    use tempfile::tempdir;

    fn config_in(root: &std::path::Path, capture: CaptureConfig) -> FileConfig {
        let mut config = FileConfig {
            capture,
            ..FileConfig::default()
        };
        config.output.root = Some(root.to_path_buf());
        config.output.max_cycles = Some(2);
        config
    }

    #[test]
    fn test_failed_open_leaves_no_run_directory() {
        let root = tempdir().unwrap();
        let config = config_in(root.path(), CaptureConfig::with_dimensions(0, 0));

        run_with(MockCamera::new(), config, CancelToken::new());

        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_run_writes_into_one_run_directory() {
        let root = tempdir().unwrap();
        let config = config_in(root.path(), CaptureConfig::with_dimensions(8, 8));

        run_with(MockCamera::new(), config, CancelToken::new());

        let run_dir = root.path().join("critters0001");
        assert!(run_dir.join("metrics.prom").exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_compare_defaults_to_still_image_object_size() {
        let defaults = DetectionArgs {
            threshold: None,
            object_size: None,
            adaptive: false,
        };
        let config = compare_config(&defaults);
        assert_eq!(config.object_size, COMPARE_OBJECT_SIZE);
        assert_eq!(config.threshold, CycleConfig::default().threshold);

        let tuned = DetectionArgs {
            threshold: Some(40),
            object_size: Some(2000),
            adaptive: true,
        };
        let config = compare_config(&tuned);
        assert_eq!(config.object_size, 2000);
        assert_eq!(config.threshold, 40);
        assert!(config.adaptive_noise_filter);
    }

    #[test]
    fn test_source_kinds() {
        assert!(matches!("mock".parse(), Ok(SourceKind::Mock)));
        assert!(matches!(
            "dir:footage".parse::<SourceKind>(),
            Ok(SourceKind::Directory(path)) if path == std::path::Path::new("footage")
        ));
        assert!("dir:".parse::<SourceKind>().is_err());
        assert!("webcam".parse::<SourceKind>().is_err());
    }
}
