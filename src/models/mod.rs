//! Recognition model readiness
//!
//! The detection, landmark and embedding models are loaded once per process
//! through a `ModelGate`. Every session awaits the gate before capturing;
//! only the first caller triggers the load and all callers observe the same
//! terminal outcome.

mod assets;
mod gate;

pub use assets::{AssetDirLoader, ModelArtifact, ModelKind, ModelLoadError, ModelLoader, ModelSet};
pub use gate::{ModelGate, ModelReadiness};
