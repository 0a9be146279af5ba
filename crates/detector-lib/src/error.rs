//! Error taxonomy for the detection service
//!
//! Every failure is converted into one of these kinds at the boundary where it
//! happens. [`DetectorError::public_message`] is the only text that leaves the
//! process; the `Display` output is for logs.

use std::path::PathBuf;
use thiserror::Error;

/// Structural problems with a prediction payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON")]
    MalformedJson,

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("field `data` is required")]
    MissingField,

    #[error("field `data` must be an array of {expected} numbers")]
    NotAnArray { expected: usize },

    #[error("field `data` must contain exactly {expected} numbers, got {actual}")]
    WrongArity { expected: usize, actual: usize },

    #[error("`data[{index}]` must be a number")]
    NotANumber { index: usize },

    #[error("`data[{index}]` must be a finite number")]
    NonFinite { index: usize },
}

/// Reasons a model artifact could not be loaded at startup
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("model artifact is {size} bytes, exceeds maximum {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("failed to prepare ONNX model: {0}")]
    Onnx(String),
}

/// Coarse error classification used for status codes and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    ModelUnavailable,
    Inference,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::Inference => "inference",
        }
    }
}

/// Request-time failures surfaced to callers
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("model artifact not loaded")]
    ModelUnavailable,

    #[error("inference failed: {0}")]
    Inference(String),
}

pub type DetectorResult<T> = Result<T, DetectorError>;

impl DetectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetectorError::Validation(_) => ErrorKind::Validation,
            DetectorError::ModelUnavailable => ErrorKind::ModelUnavailable,
            DetectorError::Inference(_) => ErrorKind::Inference,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 422,
            ErrorKind::ModelUnavailable => 503,
            ErrorKind::Inference => 500,
        }
    }

    /// Message safe to return to callers. Validation messages describe the
    /// violated constraint; the other kinds use fixed text.
    pub fn public_message(&self) -> String {
        match self {
            DetectorError::Validation(e) => e.to_string(),
            DetectorError::ModelUnavailable => {
                "Model artifact not loaded. Service unavailable.".to_string()
            }
            DetectorError::Inference(_) => {
                "Internal processing error during prediction.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = DetectorError::from(ValidationError::MissingField);
        assert_eq!(validation.status_code(), 422);
        assert_eq!(DetectorError::ModelUnavailable.status_code(), 503);
        assert_eq!(DetectorError::Inference("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_inference_detail_not_public() {
        let err = DetectorError::Inference("shape mismatch in /opt/models/a.onnx".into());
        let message = err.public_message();

        assert!(!message.contains("shape mismatch"));
        assert!(!message.contains("/opt/models"));
        assert!(err.to_string().contains("shape mismatch"));
    }

    #[test]
    fn test_validation_message_describes_constraint() {
        let err = DetectorError::from(ValidationError::WrongArity {
            expected: 2,
            actual: 1,
        });
        assert_eq!(
            err.public_message(),
            "field `data` must contain exactly 2 numbers, got 1"
        );
        assert_eq!(err.kind().as_str(), "validation");
    }
}
