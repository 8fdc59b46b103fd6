//! Frame acquisition.
//!
//! This module provides the frames the detector compares and the video
//! recording used when a critter is detected. Sources are interchangeable
//! behind the [`FrameSource`] trait: a synthetic/scripted mock, a directory
//! of stills replayed in order, or a real camera (`camera` feature).

mod camera;
mod config;
#[cfg(feature = "camera")]
mod device;
mod frame;
mod mjpeg;
mod sequence;

pub use camera::{CameraError, FrameSource, MockCamera};
pub use config::CaptureConfig;
#[cfg(feature = "camera")]
pub use device::DeviceCamera;
pub use frame::{EncodedImage, Frame, FrameError, Shape, CHANNELS};
pub use mjpeg::MjpegWriter;
pub use sequence::ImageSequenceSource;
