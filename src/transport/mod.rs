//! Transport strategies for the recognition backend
//!
//! - `Unary`: one outbound call per frame, one response (HTTP)
//! - `Streaming`: persistent channel, frames pushed, results pushed back (NATS)
//!
//! Both deliver replies into the session as generation-tagged `Delivery`
//! values, so the session loop never needs to know which variant is active.

pub mod http;
pub mod messages;
pub mod nats;
mod strategy;

pub use http::{HttpUnaryConfig, HttpUnaryTransport};
pub use messages::{RecognizeRequest, RecognizeResponse, StreamPush, StudentRecord};
pub use nats::{NatsStreamingConfig, NatsStreamingTransport};
pub use strategy::{
    Delivery, Identity, RecognitionReply, ReplySink, StreamChannel, StreamingTransport,
    TransportError, TransportKind, TransportStrategy, UnaryTransport,
};
