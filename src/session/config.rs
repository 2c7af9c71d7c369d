use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session identifier (e.g., "face-2f1c...")
    pub session_id: String,

    /// Interval between capture ticks
    /// Default: 1000 ms
    pub poll_interval_ms: u64,

    /// How long an outstanding request may stay unresolved before it counts
    /// as a transport failure
    /// Default: 5000 ms
    pub result_timeout_ms: u64,

    /// Consecutive transport failures tolerated before the session stops itself
    pub max_consecutive_failures: u32,

    /// JPEG quality for transmitted frames (1-100)
    pub jpeg_quality: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("face-{}", uuid::Uuid::new_v4()),
            poll_interval_ms: 1000,
            result_timeout_ms: 5000,
            max_consecutive_failures: 5,
            jpeg_quality: 80,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms.max(1))
    }
}
