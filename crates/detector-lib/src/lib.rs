//! Core library for the anomaly detection service
//!
//! This crate provides the core functionality for:
//! - Loading a serialized anomaly model once at startup
//! - Validating prediction payloads into feature vectors
//! - Running inference with controlled error semantics
//! - Health reporting and observability
//! - Offline training of the Isolation Forest artifact

pub mod error;
pub mod health;
pub mod inference;
pub mod model;
pub mod models;
pub mod observability;
pub mod training;
pub mod validation;

pub use error::{DetectorError, ErrorKind, LoadError, ValidationError};
pub use health::{ComponentStatus, HealthReporter, HealthResponse, LivenessResponse};
pub use inference::InferenceEngine;
pub use model::{AnomalyModel, ArtifactFormat, ModelHandle, ModelInfo, ModelLoader};
pub use models::*;
pub use observability::{DetectorMetrics, StructuredLogger};
pub use validation::validate_payload;
