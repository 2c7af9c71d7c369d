use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;
use crate::transport::TransportKind;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub models: ModelsConfig,
    pub capture: CaptureConfig,
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct ModelsConfig {
    /// Directory holding the three `*-weights_manifest.json` model sets
    pub base_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    pub frames_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    pub transport: TransportKind,
    /// Unary recognition endpoint
    pub endpoint: String,
    pub nats_url: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub poll_interval_ms: u64,
    pub result_timeout_ms: u64,
    pub max_consecutive_failures: u32,
    pub jpeg_quality: u8,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            poll_interval_ms: defaults.poll_interval_ms,
            result_timeout_ms: defaults.result_timeout_ms,
            max_consecutive_failures: defaults.max_consecutive_failures,
            jpeg_quality: defaults.jpeg_quality,
        }
    }
}

impl SessionSettings {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval_ms: self.poll_interval_ms,
            result_timeout_ms: self.result_timeout_ms,
            max_consecutive_failures: self.max_consecutive_failures,
            jpeg_quality: self.jpeg_quality,
            ..SessionConfig::default()
        }
    }
}

fn default_subject_prefix() -> String {
    "face".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid config {}", path))
    }
}
