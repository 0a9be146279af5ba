//! One-shot model loading at startup
//!
//! Loading never aborts the process: any failure yields an unavailable
//! [`ModelHandle`] carrying the diagnostic reason, so the service can still
//! come up and report its degraded state.

use super::{AnomalyModel, ArtifactFormat, IsolationForest, ModelHandle, ModelInfo, OnnxModel};
use crate::error::LoadError;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default cap on artifact size (64 MiB)
pub const DEFAULT_MAX_MODEL_SIZE: u64 = 64 * 1024 * 1024;

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Loads the model artifact from a fixed path
#[derive(Debug, Clone)]
pub struct ModelLoader {
    path: PathBuf,
    expected_checksum: Option<String>,
    max_model_size: u64,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_checksum: None,
            max_model_size: DEFAULT_MAX_MODEL_SIZE,
        }
    }

    /// Require the artifact to match this SHA256 (hex)
    pub fn with_expected_checksum(mut self, checksum: Option<String>) -> Self {
        self.expected_checksum = checksum.map(|c| c.trim().to_ascii_lowercase());
        self
    }

    pub fn with_max_model_size(mut self, max_bytes: u64) -> Self {
        self.max_model_size = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the artifact, converting any failure into an unavailable handle
    pub fn load(&self) -> ModelHandle {
        match self.try_load() {
            Ok((model, info)) => ModelHandle::loaded(model, info),
            Err(e) => ModelHandle::unavailable(e.to_string()),
        }
    }

    /// Load the artifact, returning the failure reason on error
    pub fn try_load(&self) -> Result<(Arc<dyn AnomalyModel>, ModelInfo), LoadError> {
        let metadata = fs::metadata(&self.path).map_err(|e| self.map_io_error(e))?;
        if metadata.len() > self.max_model_size {
            return Err(LoadError::TooLarge {
                size: metadata.len(),
                max: self.max_model_size,
            });
        }

        let bytes = fs::read(&self.path).map_err(|e| self.map_io_error(e))?;
        let checksum = compute_checksum(&bytes);

        if let Some(expected) = &self.expected_checksum {
            if *expected != checksum {
                return Err(LoadError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
        }

        let format = ArtifactFormat::from_path(&self.path);
        debug!(
            path = %self.path.display(),
            format = %format,
            size = bytes.len(),
            "Deserializing model artifact"
        );

        let model: Arc<dyn AnomalyModel> = match format {
            ArtifactFormat::Forest => Arc::new(IsolationForest::from_json(&bytes)?),
            ArtifactFormat::Onnx => Arc::new(OnnxModel::from_bytes(&bytes)?),
        };

        let info = ModelInfo {
            format,
            checksum,
            size_bytes: bytes.len() as u64,
            loaded_at: chrono::Utc::now().timestamp(),
        };

        Ok((model, info))
    }

    fn map_io_error(&self, error: std::io::Error) -> LoadError {
        if error.kind() == ErrorKind::NotFound {
            LoadError::NotFound {
                path: self.path.clone(),
            }
        } else {
            LoadError::Io(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IsolationTree, Node};
    use crate::models::{AnomalyScore, FeatureVector};
    use tempfile::TempDir;

    fn write_forest(dir: &TempDir, name: &str) -> PathBuf {
        let forest = IsolationForest {
            format_version: 1,
            n_features: 2,
            max_samples: 2,
            offset: -0.4,
            trees: vec![IsolationTree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 1,
                        right: 2,
                    },
                    Node::Leaf { size: 1 },
                    Node::Leaf { size: 2 },
                ],
            }],
        };
        let path = dir.path().join(name);
        fs::write(&path, forest.to_json_pretty().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64); // SHA256 hex is 64 chars
        assert_eq!(checksum, compute_checksum(b"test model weights"));
    }

    #[test]
    fn test_load_valid_forest() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_forest(&temp_dir, "anomaly_detector.json");

        let handle = ModelLoader::new(&path).load();
        assert!(handle.is_loaded());

        let info = handle.info().unwrap();
        assert_eq!(info.format, ArtifactFormat::Forest);
        assert_eq!(info.checksum, compute_checksum(&fs::read(&path).unwrap()));

        let model = handle.model().unwrap();
        let features = FeatureVector::new(-1.0, 0.0).unwrap();
        assert_eq!(model.score(&features).unwrap(), AnomalyScore::Anomaly);
        assert_eq!(model.name(), "isolation_forest");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ModelLoader::new(temp_dir.path().join("missing.json"));

        assert!(matches!(loader.try_load(), Err(LoadError::NotFound { .. })));

        let handle = loader.load();
        assert!(!handle.is_loaded());
        assert!(handle.failure_reason().unwrap().contains("not found"));
    }

    #[test]
    fn test_corrupt_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("anomaly_detector.json");
        fs::write(&path, b"\x80\x04\x95 pickled bytes").unwrap();

        let loader = ModelLoader::new(&path);
        assert!(matches!(loader.try_load(), Err(LoadError::Parse(_))));
        assert!(!loader.load().is_loaded());
    }

    #[test]
    fn test_checksum_verification() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_forest(&temp_dir, "anomaly_detector.json");
        let actual = compute_checksum(&fs::read(&path).unwrap());

        let mismatched = ModelLoader::new(&path).with_expected_checksum(Some("00".repeat(32)));
        assert!(matches!(
            mismatched.try_load(),
            Err(LoadError::ChecksumMismatch { .. })
        ));

        let matched =
            ModelLoader::new(&path).with_expected_checksum(Some(actual.to_ascii_uppercase()));
        assert!(matched.load().is_loaded());
    }

    #[test]
    fn test_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_forest(&temp_dir, "anomaly_detector.json");

        let loader = ModelLoader::new(&path).with_max_model_size(16);
        assert!(matches!(loader.try_load(), Err(LoadError::TooLarge { .. })));
    }

    #[test]
    fn test_onnx_extension_uses_onnx_backend() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.onnx");
        fs::write(&path, b"not an onnx graph").unwrap();

        assert!(matches!(
            ModelLoader::new(&path).try_load(),
            Err(LoadError::Onnx(_))
        ));
    }
}
