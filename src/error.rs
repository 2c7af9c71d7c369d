//! Errors surfaced to the host that drives a recognition session.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::models::ModelLoadError;
use crate::transport::TransportError;

/// Everything a session can report to its host.
///
/// `PermissionDenied`, `DeviceUnavailable` and `ModelLoad` are fatal at
/// start. `Transport` is recoverable inside the capture loop and only
/// becomes fatal once the consecutive failure budget is spent.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("recognition models failed to load: {0}")]
    ModelLoad(#[from] ModelLoadError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("a recognition session is already active")]
    SessionAlreadyActive,

    #[error("session was stopped before it became ready")]
    Cancelled,
}

impl SessionError {
    /// Stable name used in logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::PermissionDenied(_) => "PermissionDenied",
            SessionError::DeviceUnavailable(_) => "DeviceUnavailable",
            SessionError::ModelLoad(_) => "ModelLoadError",
            SessionError::Transport(_) => "TransportError",
            SessionError::SessionAlreadyActive => "SessionAlreadyActive",
            SessionError::Cancelled => "Cancelled",
        }
    }
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(msg) => SessionError::PermissionDenied(msg),
            CaptureError::DeviceUnavailable(msg) => SessionError::DeviceUnavailable(msg),
            CaptureError::Frame(msg) => SessionError::DeviceUnavailable(msg),
        }
    }
}
