use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

use super::frame::RawFrame;

#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("jpeg encoding failed: {0}")]
    Codec(String),
}

/// Output of a single encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Compressed JPEG bytes ready for transmission
    Jpeg(Vec<u8>),
    /// Zero-area frame; wait for the next tick
    Skipped,
}

/// Converts raw frames into JPEG bytes
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

impl FrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn encode(&self, frame: &RawFrame) -> Result<Encoded, EncodeError> {
        if frame.is_empty() {
            return Ok(Encoded::Skipped);
        }

        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.pixels.len() != expected {
            return Err(EncodeError::BufferSize {
                width: frame.width,
                height: frame.height,
                expected,
                actual: frame.pixels.len(),
            });
        }

        let mut jpeg = Vec::with_capacity(expected / 8);
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode(&frame.pixels, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| EncodeError::Codec(e.to_string()))?;

        Ok(Encoded::Jpeg(jpeg))
    }
}
