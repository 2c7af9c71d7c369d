use super::state::{RecognitionResult, SessionState};
use crate::error::SessionError;

/// Callbacks the session makes into the UI host that owns it.
///
/// Called while the session holds its state lock: implementations must return
/// quickly and must not call back into the session.
pub trait SessionHost: Send + Sync {
    fn on_state_change(&self, state: SessionState);

    fn on_result(&self, result: &RecognitionResult);

    /// Fatal start failures, recoverable transport failures and budget exhaustion
    fn on_error(&self, _generation: u64, _error: &SessionError) {}
}

/// Host that ignores every callback
pub struct NullHost;

impl SessionHost for NullHost {
    fn on_state_change(&self, _state: SessionState) {}

    fn on_result(&self, _result: &RecognitionResult) {}
}
