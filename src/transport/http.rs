// Unary recognition over HTTP
//
// One POST per frame carrying the frame as a JPEG data URL. ureq is
// blocking, so each call runs on the blocking pool.

use std::time::Duration;
use tracing::{debug, warn};

use super::messages::{RecognizeRequest, RecognizeResponse};
use super::strategy::{RecognitionReply, TransportError, UnaryTransport};
use crate::capture::CapturedFrame;

#[derive(Debug, Clone)]
pub struct HttpUnaryConfig {
    /// Full URL of the recognition endpoint (e.g. http://localhost:5000/api/recognize)
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Session token from the console's login, sent as a bearer token
    pub bearer_token: Option<String>,
}

pub struct HttpUnaryTransport {
    config: HttpUnaryConfig,
    agent: ureq::Agent,
}

impl HttpUnaryTransport {
    pub fn new(config: HttpUnaryConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait::async_trait]
impl UnaryTransport for HttpUnaryTransport {
    async fn send(&self, frame: &CapturedFrame) -> Result<RecognitionReply, TransportError> {
        let body = serde_json::to_string(&RecognizeRequest::from_jpeg(&frame.payload))
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let agent = self.agent.clone();
        let endpoint = self.config.endpoint.clone();
        let token = self.config.bearer_token.clone();
        let sequence = frame.sequence;

        debug!(
            "POST {} (generation={}, sequence={}, bytes={})",
            endpoint,
            frame.generation,
            sequence,
            frame.payload.len()
        );

        let text = tokio::task::spawn_blocking(move || {
            let mut request = agent
                .post(&endpoint)
                .set("Content-Type", "application/json");
            if let Some(token) = &token {
                request = request.set("Authorization", &format!("Bearer {}", token));
            }

            match request.send_string(&body) {
                Ok(response) => response
                    .into_string()
                    .map_err(|e| TransportError::Request(e.to_string())),
                Err(ureq::Error::Status(code, _)) => Err(TransportError::Status(code)),
                Err(ureq::Error::Transport(e)) => Err(TransportError::Connect(e.to_string())),
            }
        })
        .await
        .map_err(|e| TransportError::Request(format!("request worker failed: {}", e)))??;

        let response: RecognizeResponse = serde_json::from_str(&text).map_err(|e| {
            warn!("Unparseable recognition response: {}", e);
            TransportError::Malformed(e.to_string())
        })?;

        Ok(RecognitionReply::from(response).with_sequence(sequence))
    }

    fn name(&self) -> &str {
        "http"
    }
}
