use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use super::host::SessionHost;
use super::state::{RecognitionResult, SessionState};
use crate::error::SessionError;
use crate::transport::Identity;

/// Sink that renders recognition outcomes for the user
pub trait ResultPresenter: Send + Sync {
    /// Show a result, replacing whatever is displayed
    fn present(&self, result: &RecognitionResult);

    /// Show a transient failure notice
    fn present_error(&self, generation: u64, message: &str);

    /// Remove the displayed notice
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Match,
    NoMatch,
    Error,
}

/// What the console currently shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub generation: u64,
    pub kind: NoticeKind,
    pub text: String,
    pub identity: Option<Identity>,
    pub shown_at_ms: i64,
}

#[derive(Debug)]
struct Board {
    /// Newest generation seen; older results never overwrite newer ones
    generation: u64,
    state: SessionState,
    notice: Option<Notice>,
}

/// Presenter holding at most one notice, read by the control API
#[derive(Debug)]
pub struct NoticeBoard {
    board: Mutex<Board>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self {
            board: Mutex::new(Board {
                generation: 0,
                state: SessionState::Idle,
                notice: None,
            }),
        }
    }

    pub fn current(&self) -> Option<Notice> {
        self.lock().notice.clone()
    }

    /// Session state as last reported by the session
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn show(&self, notice: Notice) {
        let mut board = self.lock();
        if notice.generation < board.generation {
            return;
        }
        board.generation = notice.generation;
        board.notice = Some(notice);
    }
}

impl ResultPresenter for NoticeBoard {
    fn present(&self, result: &RecognitionResult) {
        let kind = if result.matched {
            NoticeKind::Match
        } else {
            NoticeKind::NoMatch
        };

        self.show(Notice {
            generation: result.generation,
            kind,
            text: result.notice_text(),
            identity: result.identity.clone(),
            shown_at_ms: result.received_at_ms,
        });
    }

    fn present_error(&self, generation: u64, message: &str) {
        self.show(Notice {
            generation,
            kind: NoticeKind::Error,
            text: message.to_string(),
            identity: None,
            shown_at_ms: chrono::Utc::now().timestamp_millis(),
        });
    }

    fn clear(&self) {
        self.lock().notice = None;
    }
}

impl SessionHost for NoticeBoard {
    fn on_state_change(&self, state: SessionState) {
        self.lock().state = state;
        // A stopped or restarting session must not keep showing an old identity
        if matches!(
            state,
            SessionState::Terminated | SessionState::ModelLoading | SessionState::Idle
        ) {
            self.clear();
        }
    }

    fn on_result(&self, result: &RecognitionResult) {
        self.present(result);
    }

    fn on_error(&self, generation: u64, error: &SessionError) {
        let message = match error {
            SessionError::Transport(e) => format!("Error sending image to server: {}", e),
            other => other.to_string(),
        };
        self.present_error(generation, &message);
    }
}
