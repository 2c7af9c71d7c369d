//! HTTP API server for the admin console
//!
//! This module exposes the face-match session to the browser console:
//! - POST /session/start - Start a new generation
//! - POST /session/stop - Stop the session
//! - GET /session/status - Query session status
//! - GET /session/notice - Notice currently displayed
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
