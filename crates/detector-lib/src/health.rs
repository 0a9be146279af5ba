//! Health reporting for the detection service
//!
//! Health is a pure read of the model handle. Orchestrators use it to tell
//! "process down" (no answer) from "process up but model missing" (degraded).

use crate::model::{ArtifactFormat, ModelHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Model loaded, predictions are served
    Healthy,
    /// Process is up but the model is missing
    Degraded,
}

impl ComponentStatus {
    /// HTTP status code for probes: 200 when healthy, 503 otherwise
    pub fn http_status(&self) -> u16 {
        match self {
            ComponentStatus::Healthy => 200,
            ComponentStatus::Degraded => 503,
        }
    }
}

/// Health response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub service: String,
    pub version: String,
    pub model_loaded: bool,
    pub ready: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_format: Option<ArtifactFormat>,
    pub checked_at: i64,
}

/// Liveness response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub alive: bool,
}

/// Reads the model handle to answer health probes
#[derive(Debug, Clone)]
pub struct HealthReporter {
    handle: Arc<ModelHandle>,
    service: String,
    version: String,
}

impl HealthReporter {
    pub fn new(handle: Arc<ModelHandle>, service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            handle,
            service: service.into(),
            version: version.into(),
        }
    }

    /// Current health, computed fresh on every call
    pub fn health(&self) -> HealthResponse {
        let model_loaded = self.handle.is_loaded();

        let (status, message) = if model_loaded {
            (
                ComponentStatus::Healthy,
                "Service is running and ML model is operational.",
            )
        } else {
            (
                ComponentStatus::Degraded,
                "Service is running, but the ML model failed to load.",
            )
        };

        HealthResponse {
            status,
            service: self.service.clone(),
            version: self.version.clone(),
            model_loaded,
            ready: model_loaded,
            message: message.to_string(),
            model_format: self.handle.info().map(|info| info.format),
            checked_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Liveness never depends on the model
    pub fn liveness(&self) -> LivenessResponse {
        LivenessResponse { alive: true }
    }
}
