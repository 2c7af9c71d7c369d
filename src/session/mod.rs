//! Recognition session management
//!
//! This module provides the `RecognitionSession` abstraction that manages:
//! - Waiting on the process-wide model gate
//! - Camera acquisition and guaranteed release
//! - Periodic frame capture, encoding and transmission
//! - Generation tagging so stale replies are dropped
//! - Result delivery to the host and its presenter

mod capture_loop;
mod config;
mod host;
mod presenter;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use host::{NullHost, SessionHost};
pub use presenter::{Notice, NoticeBoard, NoticeKind, ResultPresenter};
pub use session::RecognitionSession;
pub use state::{RecognitionResult, SessionState};
pub use stats::SessionStats;
