//! Frame type representing one decoded RGB image with metadata.

use image::{ImageFormat, RgbImage};
use std::fmt;

/// Number of colour channels in every frame (R, G, B).
pub const CHANNELS: usize = 3;

/// Dimensions of a frame as (rows, columns, channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Image height.
    pub rows: usize,
    /// Image width.
    pub cols: usize,
    /// Always [`CHANNELS`].
    pub channels: usize,
}

impl Shape {
    /// An RGB shape of `rows` by `cols` pixels.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            channels: CHANNELS,
        }
    }

    /// Number of pixels (rows * cols).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of intensity values (rows * cols * channels).
    #[inline]
    pub fn len(&self) -> usize {
        self.pixel_count() * self.channels
    }

    /// True for a zero-sized frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.rows, self.cols, self.channels)
    }
}

/// Errors building a frame from raw data.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FrameError {
    /// The pixel buffer does not match the requested dimensions.
    #[error("pixel buffer holds {actual} values, shape {shape} needs {expected}")]
    BufferSize {
        /// Requested shape.
        shape: Shape,
        /// Values the shape needs.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },
    /// The bytes are not an image `image` can read.
    #[error("failed to decode image: {0}")]
    Decode(String),
}

/// The encoded image a frame was decoded from.
///
/// Kept so a detected frame can be persisted byte-for-byte instead of
/// being re-encoded.
#[derive(Clone)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl EncodedImage {
    /// Wraps `bytes` already encoded as `format`.
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Self { bytes, format }
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The encoding of [`EncodedImage::bytes`].
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Preferred file extension for this encoding.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A single captured frame.
///
/// Pixels are stored row-major as interleaved RGB triples, so the value for
/// (row, col, channel) lives at `(row * cols + col) * 3 + channel`. A frame
/// is never mutated after construction.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    shape: Shape,
    /// Monotonic sequence number assigned by the source.
    sequence: u64,
    encoded: Option<EncodedImage>,
}

impl Frame {
    /// Creates a frame from interleaved RGB pixels.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self, FrameError> {
        let shape = Shape::new(height as usize, width as usize);
        if pixels.len() != shape.len() {
            return Err(FrameError::BufferSize {
                shape,
                expected: shape.len(),
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            shape,
            sequence,
            encoded: None,
        })
    }

    /// Creates a frame where every pixel has the same colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let shape = Shape::new(height as usize, width as usize);
        let pixels = rgb.iter().copied().cycle().take(shape.len()).collect();
        Self {
            pixels,
            shape,
            sequence,
            encoded: None,
        }
    }

    /// Wraps a decoded RGB image.
    pub fn from_rgb_image(image: RgbImage, sequence: u64) -> Self {
        let shape = Shape::new(image.height() as usize, image.width() as usize);
        Self {
            pixels: image.into_raw(),
            shape,
            sequence,
            encoded: None,
        }
    }

    /// Decodes an encoded image (JPEG, PNG, ...) and keeps the original bytes.
    pub fn decode(bytes: Vec<u8>, sequence: u64) -> Result<Self, FrameError> {
        let format = image::guess_format(&bytes).map_err(|e| FrameError::Decode(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .into_rgb8();
        let mut frame = Self::from_rgb_image(decoded, sequence);
        frame.encoded = Some(EncodedImage::new(bytes, format));
        Ok(frame)
    }

    /// Returns a reference to the raw interleaved pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the (rows, cols, channels) shape.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns the frame width (columns).
    #[inline]
    pub fn width(&self) -> u32 {
        self.shape.cols as u32
    }

    /// Returns the frame height (rows).
    #[inline]
    pub fn height(&self) -> u32 {
        self.shape.rows as u32
    }

    /// Returns the RGB triple at (row, col).
    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        if row >= self.shape.rows || col >= self.shape.cols {
            return None;
        }
        let i = (row * self.shape.cols + col) * CHANNELS;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the encoded image this frame was decoded from, if any.
    pub fn encoded(&self) -> Option<&EncodedImage> {
        self.encoded.as_ref()
    }

    /// Copies the pixels into an `image` buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        // Length is checked at construction, so from_raw cannot fail.
        RgbImage::from_raw(self.width(), self.height(), self.pixels.clone())
            .unwrap_or_else(|| RgbImage::new(self.width(), self.height()))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("shape", &self.shape)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .field("encoded", &self.encoded.as_ref().map(|e| e.format()))
            .finish()
    }
}
