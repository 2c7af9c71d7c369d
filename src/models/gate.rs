use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tracing::{error, info};

use super::assets::{ModelLoadError, ModelLoader, ModelSet};

/// Load status of the process-wide recognition models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelReadiness {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

impl ModelReadiness {
    pub fn is_terminal(self) -> bool {
        matches!(self, ModelReadiness::Ready | ModelReadiness::Failed)
    }
}

/// Loads the recognition models once and hands every caller the same outcome.
///
/// `Failed` is sticky: the loader is never re-run for the lifetime of the gate.
/// Share one gate (behind an `Arc`) between all sessions of a process.
pub struct ModelGate {
    loader: Box<dyn ModelLoader>,
    outcome: OnceCell<Result<Arc<ModelSet>, ModelLoadError>>,
    status: watch::Sender<ModelReadiness>,
}

impl ModelGate {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        let (status, _) = watch::channel(ModelReadiness::NotLoaded);
        Self {
            loader,
            outcome: OnceCell::new(),
            status,
        }
    }

    pub fn status(&self) -> ModelReadiness {
        *self.status.borrow()
    }

    /// Observe status changes
    pub fn subscribe(&self) -> watch::Receiver<ModelReadiness> {
        self.status.subscribe()
    }

    /// Wait until the models are usable, loading them on first call.
    ///
    /// Safe to call concurrently; later callers wait for the in-progress load.
    pub async fn ensure_ready(&self) -> Result<Arc<ModelSet>, ModelLoadError> {
        let outcome = self
            .outcome
            .get_or_init(|| async {
                self.status.send_replace(ModelReadiness::Loading);
                info!("Model load started ({})", self.loader.name());

                match self.loader.load().await {
                    Ok(models) => {
                        info!(
                            "Models ready: {} artifacts, {} bytes",
                            models.artifacts.len(),
                            models.total_bytes()
                        );
                        self.status.send_replace(ModelReadiness::Ready);
                        Ok(Arc::new(models))
                    }
                    Err(e) => {
                        error!("Model load failed: {}", e);
                        self.status.send_replace(ModelReadiness::Failed);
                        Err(e)
                    }
                }
            })
            .await;

        outcome.clone()
    }
}
