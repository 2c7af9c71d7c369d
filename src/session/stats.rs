use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Statistics about a recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// Current generation
    pub generation: u64,

    /// When the current generation was started
    pub started_at: Option<DateTime<Utc>>,

    /// Frames read from the capture source
    pub frames_captured: u64,

    /// Ticks that produced no transmittable frame (camera not ready, zero area)
    pub frames_skipped: u64,

    /// Frames handed to the transport
    pub frames_sent: u64,

    /// Results presented with an identity
    pub matches: u64,

    /// Results presented without an identity
    pub no_matches: u64,

    /// Transport failures, including timeouts
    pub transport_failures: u64,

    /// Replies discarded because they belonged to another generation or frame
    pub stale_discarded: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            started_at: None,
            frames_captured: 0,
            frames_skipped: 0,
            frames_sent: 0,
            matches: 0,
            no_matches: 0,
            transport_failures: 0,
            stale_discarded: 0,
        }
    }
}
