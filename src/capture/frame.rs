/// Most recent visual buffer read from a capture device (RGB8, row-major)
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Raw pixels, 3 bytes per pixel
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Wall-clock capture time in milliseconds since the Unix epoch
    pub captured_at_ms: i64,
}

impl RawFrame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// A camera that has not started producing data reports zero dimensions.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

/// One encoded frame on its way to the recognition backend.
///
/// Ephemeral: consumed once by the transport, never persisted.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Session generation the frame was captured under
    pub generation: u64,
    /// Per-generation send counter, used to correlate streamed replies
    pub sequence: u64,
    /// Capture time in milliseconds since the Unix epoch
    pub captured_at_ms: i64,
    /// JPEG bytes
    pub payload: Vec<u8>,
}
