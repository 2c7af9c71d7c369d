use async_nats::{Client, HeaderMap};
use futures::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::messages::StreamPush;
use super::strategy::{
    RecognitionReply, ReplySink, StreamChannel, StreamingTransport, TransportError,
};
use crate::capture::CapturedFrame;

pub const GENERATION_HEADER: &str = "Frame-Generation";
pub const SEQUENCE_HEADER: &str = "Frame-Sequence";

#[derive(Debug, Clone)]
pub struct NatsStreamingConfig {
    /// NATS server URL
    pub url: String,
    /// Subject prefix (frames go to `<prefix>.frame.<session>`)
    pub subject_prefix: String,
    /// Session identifier used in subjects
    pub session_id: String,
}

impl NatsStreamingConfig {
    pub fn frame_subject(&self) -> String {
        format!("{}.frame.{}", self.subject_prefix, self.session_id)
    }

    pub fn result_subject(&self) -> String {
        format!("{}.result.{}", self.subject_prefix, self.session_id)
    }
}

/// Streaming recognition over NATS pub/sub
pub struct NatsStreamingTransport {
    config: NatsStreamingConfig,
}

impl NatsStreamingTransport {
    pub fn new(config: NatsStreamingConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl StreamingTransport for NatsStreamingTransport {
    async fn open(&self, sink: ReplySink) -> Result<Box<dyn StreamChannel>, TransportError> {
        info!("Connecting to NATS at {}", self.config.url);

        let client = async_nats::connect(self.config.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let result_subject = self.config.result_subject();
        let mut subscriber = client
            .subscribe(result_subject.clone())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!("Subscribed to {}", result_subject);

        let listener = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let outcome = serde_json::from_slice::<StreamPush>(&msg.payload)
                    .map(RecognitionReply::from)
                    .map_err(|e| {
                        warn!("Failed to parse recognition push: {}", e);
                        TransportError::Malformed(e.to_string())
                    });

                if !sink.deliver(outcome).await {
                    break;
                }
            }

            info!("Recognition push listener stopped");
        });

        Ok(Box::new(NatsChannel {
            client,
            frame_subject: self.config.frame_subject(),
            listener: Some(listener),
        }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

struct NatsChannel {
    client: Client,
    frame_subject: String,
    listener: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl StreamChannel for NatsChannel {
    async fn push(&mut self, frame: &CapturedFrame) -> Result<(), TransportError> {
        if self.listener.is_none() {
            return Err(TransportError::Closed);
        }

        let mut headers = HeaderMap::new();
        headers.insert(GENERATION_HEADER, frame.generation.to_string().as_str());
        headers.insert(SEQUENCE_HEADER, frame.sequence.to_string().as_str());

        self.client
            .publish_with_headers(
                self.frame_subject.clone(),
                headers,
                frame.payload.clone().into(),
            )
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        info!(
            "Published frame to {} (generation={}, sequence={}, bytes={})",
            self.frame_subject,
            frame.generation,
            frame.sequence,
            frame.payload.len()
        );

        Ok(())
    }

    async fn close(&mut self) {
        if let Some(listener) = self.listener.take() {
            info!("Closing recognition channel {}", self.frame_subject);
            listener.abort();
            if let Err(e) = self.client.flush().await {
                warn!("NATS flush on close failed: {}", e);
            }
        }
    }
}

impl Drop for NatsChannel {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
