use crate::models::ModelGate;
use crate::session::{NoticeBoard, RecognitionSession};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The process's single recognition session
    pub session: Arc<RecognitionSession>,

    /// Presenter the session reports into
    pub notices: Arc<NoticeBoard>,

    /// Process-wide model gate
    pub gate: Arc<ModelGate>,
}

impl AppState {
    pub fn new(
        session: Arc<RecognitionSession>,
        notices: Arc<NoticeBoard>,
        gate: Arc<ModelGate>,
    ) -> Self {
        Self {
            session,
            notices,
            gate,
        }
    }
}
