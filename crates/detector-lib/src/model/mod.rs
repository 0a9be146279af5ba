//! Anomaly model artifacts and the process-wide model handle

mod forest;
mod loader;
mod onnx;

pub use forest::{average_path_length, ForestConfig, IsolationForest, IsolationTree, Node};
pub use loader::{compute_checksum, ModelLoader, DEFAULT_MAX_MODEL_SIZE};
pub use onnx::OnnxModel;

use crate::models::{AnomalyScore, FeatureVector};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Capability every loaded artifact exposes
pub trait AnomalyModel: Send + Sync {
    /// Classify a feature vector as anomalous or normal
    fn score(&self, features: &FeatureVector) -> Result<AnomalyScore>;

    /// Short name of the backing implementation
    fn name(&self) -> &str;
}

/// On-disk artifact format, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Native Isolation Forest artifact
    Forest,
    /// ONNX graph executed with tract
    Onnx,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => ArtifactFormat::Onnx,
            _ => ArtifactFormat::Forest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Forest => "forest",
            ArtifactFormat::Onnx => "onnx",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about a successfully loaded artifact
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub format: ArtifactFormat,
    pub checksum: String,
    pub size_bytes: u64,
    pub loaded_at: i64,
}

enum ModelState {
    Loaded {
        model: Arc<dyn AnomalyModel>,
        info: ModelInfo,
    },
    Unavailable {
        reason: String,
    },
}

/// Read-only handle to the model loaded at startup.
///
/// The state is fixed at construction: there is no way to load, swap or
/// unload a model afterwards, so a loaded handle stays loaded for the
/// lifetime of the process.
pub struct ModelHandle {
    state: ModelState,
}

impl ModelHandle {
    pub fn loaded(model: Arc<dyn AnomalyModel>, info: ModelInfo) -> Self {
        Self {
            state: ModelState::Loaded { model, info },
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModelState::Loaded { .. })
    }

    pub fn model(&self) -> Option<&dyn AnomalyModel> {
        match &self.state {
            ModelState::Loaded { model, .. } => Some(model.as_ref()),
            ModelState::Unavailable { .. } => None,
        }
    }

    pub fn info(&self) -> Option<&ModelInfo> {
        match &self.state {
            ModelState::Loaded { info, .. } => Some(info),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// Internal diagnostic for a failed load. Never returned to callers.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Loaded { .. } => None,
            ModelState::Unavailable { reason } => Some(reason),
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ModelState::Loaded { model, info } => f
                .debug_struct("ModelHandle")
                .field("model", &model.name())
                .field("info", info)
                .finish(),
            ModelState::Unavailable { reason } => f
                .debug_struct("ModelHandle")
                .field("unavailable", reason)
                .finish(),
        }
    }
}
