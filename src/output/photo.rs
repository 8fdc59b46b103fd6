//! Photo encoding.

use super::WriteError;
use crate::capture::Frame;
use image::ImageFormat;
use std::io::Cursor;

/// An encoded photo ready to be written.
#[derive(Debug, Clone)]
pub struct Photo {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    /// File extension matching the encoding.
    pub extension: &'static str,
}

impl Photo {
    /// Prepares `frame` for saving.
    ///
    /// Frames decoded from an image keep their original bytes, which are
    /// copied unchanged. Other frames are encoded as `fallback`.
    pub fn from_frame(frame: &Frame, fallback: ImageFormat) -> Result<Self, WriteError> {
        if let Some(encoded) = frame.encoded() {
            return Ok(Self {
                bytes: encoded.bytes().to_vec(),
                extension: encoded.extension(),
            });
        }

        let mut bytes = Vec::new();
        frame
            .to_rgb_image()
            .write_to(&mut Cursor::new(&mut bytes), fallback)
            .map_err(|e| WriteError::Encode(e.to_string()))?;

        Ok(Self {
            bytes,
            extension: fallback.extensions_str().first().copied().unwrap_or("img"),
        })
    }
}
