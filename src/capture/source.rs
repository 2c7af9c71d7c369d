use thiserror::Error;
use tracing::{debug, warn};

use super::frame::RawFrame;

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single frame could not be read; the device itself is still usable
    #[error("frame read failed: {0}")]
    Frame(String),
}

/// Camera (or camera stand-in) that can be acquired by one session at a time
///
/// Implementations:
/// - `ImageDirSource`: cycles through still images in a directory
/// - test doubles in `tests/common`
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Request device access
    async fn acquire(&self) -> Result<CaptureHandle, CaptureError>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// An acquired device producing frames
#[async_trait::async_trait]
pub trait CaptureDevice: Send {
    /// Most recent frame, or `None` while the device is not producing data yet
    async fn current_frame(&mut self) -> Result<Option<RawFrame>, CaptureError>;

    /// Stop every underlying track. Called exactly once by `CaptureHandle`.
    fn release(&mut self);
}

/// Scoped ownership of an acquired device.
///
/// Whoever holds the handle owns the camera. `release` is idempotent, and a
/// handle dropped without an explicit release (error paths, panics, aborted
/// tasks) releases on drop.
pub struct CaptureHandle {
    device: Box<dyn CaptureDevice>,
    label: String,
    released: bool,
}

impl CaptureHandle {
    pub fn new(label: impl Into<String>, device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            label: label.into(),
            released: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Read the current frame. A released handle never yields frames.
    pub async fn current_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        if self.released {
            return Ok(None);
        }
        self.device.current_frame().await
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.device.release();
        debug!("Capture handle {} released", self.label);
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!("Capture handle {} dropped without release; releasing", self.label);
            self.release();
        }
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("label", &self.label)
            .field("released", &self.released)
            .finish()
    }
}
