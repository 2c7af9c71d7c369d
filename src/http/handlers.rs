use super::state::AppState;
use crate::error::SessionError;
use crate::models::ModelReadiness;
use crate::session::{SessionState, SessionStats};
use crate::transport::TransportKind;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub generation: u64,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub state: SessionState,
    pub generation: u64,
    pub transport: TransportKind,
    pub poll_interval_ms: u64,
    pub models: ModelReadiness,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::SessionAlreadyActive => StatusCode::CONFLICT,
        SessionError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        SessionError::DeviceUnavailable(_) | SessionError::ModelLoad(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Transport(_) => StatusCode::BAD_GATEWAY,
        SessionError::Cancelled => StatusCode::CONFLICT,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a new generation of the face-match session
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.session.config().session_id.clone();
    info!("Starting face-match session: {}", session_id);

    match state.session.start().await {
        Ok(generation) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                session_id,
                generation,
                state: state.session.state(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start session: {}", e);
            (
                status_for(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: e.kind().to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /session/stop
/// Stop the session (idempotent)
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.session.config().session_id.clone();
    info!("Stopping face-match session: {}", session_id);

    let stats = state.session.stop().await;

    (StatusCode::OK, Json(StopSessionResponse { session_id, stats }))
}

/// GET /session/status
/// Get status of the session
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    let session = &state.session;
    let stats = session.stats();

    Json(SessionStatusResponse {
        session_id: session.config().session_id.clone(),
        state: stats.state,
        generation: stats.generation,
        transport: session.transport_kind(),
        poll_interval_ms: session.config().poll_interval_ms,
        models: state.gate.status(),
        stats,
    })
}

/// GET /session/notice
/// Notice currently shown to the user
pub async fn get_notice(State(state): State<AppState>) -> impl IntoResponse {
    match state.notices.current() {
        Some(notice) => (StatusCode::OK, Json(notice)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
