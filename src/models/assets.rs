use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// The three model sets a recognition session depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// SSD MobileNet v1 face-region detector
    FaceDetector,
    /// 68-point face landmark model
    Landmarks,
    /// Face embedding / recognition model
    Recognition,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::FaceDetector,
        ModelKind::Landmarks,
        ModelKind::Recognition,
    ];

    /// Asset basename as published with the browser models
    pub fn asset_name(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => "ssd_mobilenetv1_model",
            ModelKind::Landmarks => "face_landmark_68_model",
            ModelKind::Recognition => "face_recognition_model",
        }
    }

    pub fn manifest_file(self) -> String {
        format!("{}-weights_manifest.json", self.asset_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelLoadError {
    #[error("{artifact} manifest not found at {path}")]
    MissingManifest { artifact: String, path: PathBuf },

    #[error("{artifact} asset unreadable: {reason}")]
    Unreadable { artifact: String, reason: String },

    #[error("{artifact} manifest is malformed: {reason}")]
    Malformed { artifact: String, reason: String },

    #[error("{artifact} weight shard {shard} is missing or empty")]
    MissingShard { artifact: String, shard: String },
}

/// One loaded model set
#[derive(Debug, Clone, Serialize)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    pub manifest: PathBuf,
    pub shard_count: usize,
    pub total_bytes: u64,
}

/// Usable recognition capability produced by a successful load
#[derive(Debug, Clone, Serialize)]
pub struct ModelSet {
    pub artifacts: Vec<ModelArtifact>,
}

impl ModelSet {
    pub fn artifact(&self, kind: ModelKind) -> Option<&ModelArtifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|a| a.total_bytes).sum()
    }
}

/// Loads the recognition capability. Called at most once per `ModelGate`.
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<ModelSet, ModelLoadError>;

    /// Loader name for logging
    fn name(&self) -> &str;
}

/// Weight group entry in a `*-weights_manifest.json`
#[derive(Debug, Deserialize)]
struct WeightGroup {
    paths: Vec<String>,
}

/// Loads model manifests and weight shards from a base directory
pub struct AssetDirLoader {
    base_path: PathBuf,
}

impl AssetDirLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn load_artifact(&self, kind: ModelKind) -> Result<ModelArtifact, ModelLoadError> {
        let artifact = kind.asset_name().to_string();
        let manifest = self.base_path.join(kind.manifest_file());

        let raw = match tokio::fs::read(&manifest).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelLoadError::MissingManifest {
                    artifact,
                    path: manifest,
                });
            }
            Err(e) => {
                return Err(ModelLoadError::Unreadable {
                    artifact,
                    reason: format!("{}: {}", manifest.display(), e),
                });
            }
        };

        let groups: Vec<WeightGroup> =
            serde_json::from_slice(&raw).map_err(|e| ModelLoadError::Malformed {
                artifact: artifact.clone(),
                reason: e.to_string(),
            })?;

        let shards: Vec<&String> = groups.iter().flat_map(|g| g.paths.iter()).collect();
        if shards.is_empty() {
            return Err(ModelLoadError::Malformed {
                artifact,
                reason: "no weight shards listed".to_string(),
            });
        }

        let mut total_bytes = 0u64;
        for shard in &shards {
            let shard_path = self.base_path.join(shard.as_str());
            let len = tokio::fs::metadata(&shard_path)
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            if len == 0 {
                return Err(ModelLoadError::MissingShard {
                    artifact,
                    shard: shard.to_string(),
                });
            }
            debug!("{}: shard {} ({} bytes)", artifact, shard, len);
            total_bytes += len;
        }

        Ok(ModelArtifact {
            kind,
            manifest,
            shard_count: shards.len(),
            total_bytes,
        })
    }
}

#[async_trait::async_trait]
impl ModelLoader for AssetDirLoader {
    async fn load(&self) -> Result<ModelSet, ModelLoadError> {
        info!("Loading recognition models from {}", self.base_path.display());

        let mut artifacts = Vec::with_capacity(ModelKind::ALL.len());
        for kind in ModelKind::ALL {
            let artifact = self.load_artifact(kind).await?;
            info!(
                "Loaded {} ({} shards, {} bytes)",
                kind.asset_name(),
                artifact.shard_count,
                artifact.total_bytes
            );
            artifacts.push(artifact);
        }

        Ok(ModelSet { artifacts })
    }

    fn name(&self) -> &str {
        "asset directory"
    }
}
