use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::capture::CapturedFrame;

/// Which transport variant a session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Unary,
    Streaming,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Unary => f.write_str("unary"),
            TransportKind::Streaming => f.write_str("streaming"),
        }
    }
}

/// Network or channel failure. Always recoverable from the session's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no result within {0} ms")]
    Timeout(u64),

    #[error("channel closed")]
    Closed,
}

/// Identity of a matched person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<String>,
    pub display_name: String,
    pub course_or_program: Option<String>,
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.course_or_program {
            Some(course) => write!(f, "{} / {}", self.display_name, course),
            None => f.write_str(&self.display_name),
        }
    }
}

/// Backend answer for one frame, normalized across transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionReply {
    pub matched: bool,
    pub identity: Option<Identity>,
    pub message: Option<String>,
    /// Frame sequence the reply answers, when the wire carries one
    pub sequence: Option<u64>,
}

impl RecognitionReply {
    pub fn matched(identity: Identity) -> Self {
        Self {
            matched: true,
            identity: Some(identity),
            message: None,
            sequence: None,
        }
    }

    pub fn no_match() -> Self {
        Self {
            matched: false,
            identity: None,
            message: None,
            sequence: None,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// A transport outcome tagged with the generation it belongs to
#[derive(Debug, Clone)]
pub struct Delivery {
    pub generation: u64,
    /// Frame the outcome answers; `None` when the wire carries no correlation
    pub sequence: Option<u64>,
    pub outcome: Result<RecognitionReply, TransportError>,
}

/// Where transports hand replies back to the session loop.
///
/// Bound to one generation; everything delivered through it carries that tag.
#[derive(Debug, Clone)]
pub struct ReplySink {
    generation: u64,
    tx: mpsc::Sender<Delivery>,
}

impl ReplySink {
    pub fn new(generation: u64, tx: mpsc::Sender<Delivery>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the session side has gone away
    pub async fn deliver(&self, outcome: Result<RecognitionReply, TransportError>) -> bool {
        let sequence = outcome.as_ref().ok().and_then(|reply| reply.sequence);
        self.tx
            .send(Delivery {
                generation: self.generation,
                sequence,
                outcome,
            })
            .await
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Single request / single response recognition call
#[async_trait::async_trait]
pub trait UnaryTransport: Send + Sync {
    async fn send(&self, frame: &CapturedFrame) -> Result<RecognitionReply, TransportError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// Factory for persistent duplex channels
#[async_trait::async_trait]
pub trait StreamingTransport: Send + Sync {
    /// Open a channel whose replies flow into `sink`
    async fn open(&self, sink: ReplySink) -> Result<Box<dyn StreamChannel>, TransportError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// An open streaming channel, exclusively owned by one session run
#[async_trait::async_trait]
pub trait StreamChannel: Send {
    async fn push(&mut self, frame: &CapturedFrame) -> Result<(), TransportError>;

    /// Stop receiving replies. Replies already in flight are discarded as stale.
    async fn close(&mut self);
}

/// The transport a session was configured with
#[derive(Clone)]
pub enum TransportStrategy {
    Unary(Arc<dyn UnaryTransport>),
    Streaming(Arc<dyn StreamingTransport>),
}

impl TransportStrategy {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportStrategy::Unary(_) => TransportKind::Unary,
            TransportStrategy::Streaming(_) => TransportKind::Streaming,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TransportStrategy::Unary(t) => t.name(),
            TransportStrategy::Streaming(t) => t.name(),
        }
    }
}

impl std::fmt::Debug for TransportStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransportStrategy::{}({})", self.kind(), self.name())
    }
}
