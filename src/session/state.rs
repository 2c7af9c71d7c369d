use serde::{Deserialize, Serialize};

use crate::transport::{Identity, RecognitionReply};

/// Recognition session lifecycle
///
/// `Idle → ModelLoading → Ready → Capturing → AwaitingResult → Matched | NoMatch
/// → Capturing …`; `Error` and `Terminated` are reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    ModelLoading,
    Ready,
    Capturing,
    AwaitingResult,
    Matched,
    NoMatch,
    Error,
    Terminated,
}

impl SessionState {
    /// A session in one of these states owns (or is acquiring) the camera
    pub fn is_active(self) -> bool {
        !matches!(
            self,
            SessionState::Idle | SessionState::Error | SessionState::Terminated
        )
    }

    /// States from which a capture tick may start a new cycle
    pub fn accepts_tick(self) -> bool {
        matches!(
            self,
            SessionState::Ready
                | SessionState::Capturing
                | SessionState::Matched
                | SessionState::NoMatch
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::ModelLoading => "model_loading",
            SessionState::Ready => "ready",
            SessionState::Capturing => "capturing",
            SessionState::AwaitingResult => "awaiting_result",
            SessionState::Matched => "matched",
            SessionState::NoMatch => "no_match",
            SessionState::Error => "error",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Recognition outcome handed to the host, tagged with its generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub generation: u64,
    pub matched: bool,
    pub identity: Option<Identity>,
    pub message: Option<String>,
    pub received_at_ms: i64,
}

impl RecognitionResult {
    pub fn from_reply(generation: u64, reply: RecognitionReply) -> Self {
        Self {
            generation,
            matched: reply.matched,
            identity: reply.identity,
            message: reply.message,
            received_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Notice text for the console
    pub fn notice_text(&self) -> String {
        match (&self.identity, self.matched) {
            (Some(identity), true) => format!("Match found: {}", identity),
            (None, true) => match &self.message {
                Some(message) => format!("Match found: {}", message),
                None => "Match found".to_string(),
            },
            (_, false) => self
                .message
                .clone()
                .unwrap_or_else(|| "No match found".to_string()),
        }
    }
}
