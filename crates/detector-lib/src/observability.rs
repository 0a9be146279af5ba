//! Observability infrastructure for the detection service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, errors, model state)
//! - Structured JSON logging with tracing

use crate::error::ErrorKind;
use crate::model::ModelHandle;
use crate::models::AnomalyScore;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

struct DetectorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    request_errors_total: IntCounterVec,
    model_loaded: IntGauge,
    model_info: GaugeVec,
}

impl DetectorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "anomaly_detector_prediction_latency_seconds",
                "Time spent invoking the anomaly model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "anomaly_detector_predictions_total",
                "Predictions served, by outcome",
                &["outcome"]
            )
            .expect("Failed to register predictions_total"),

            request_errors_total: register_int_counter_vec!(
                "anomaly_detector_request_errors_total",
                "Prediction requests that failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register request_errors_total"),

            model_loaded: register_int_gauge!(
                "anomaly_detector_model_loaded",
                "Whether the model artifact loaded at startup (1) or not (0)"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_gauge_vec!(
                "anomaly_detector_model_info",
                "Information about the loaded model artifact",
                &["format", "checksum"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Detector metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, score: AnomalyScore) {
        self.inner()
            .predictions_total
            .with_label_values(&[score.label()])
            .inc();
    }

    pub fn inc_errors(&self, kind: ErrorKind) {
        self.inner()
            .request_errors_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Publish the startup load outcome
    pub fn set_model_state(&self, handle: &ModelHandle) {
        let inner = self.inner();
        inner.model_info.reset();

        match handle.info() {
            Some(info) => {
                inner.model_loaded.set(1);
                inner
                    .model_info
                    .with_label_values(&[info.format.as_str(), &info.checksum])
                    .set(1.0);
            }
            None => inner.model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for startup, model loading,
/// inference failures and shutdown.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_loaded: bool) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_loaded = model_loaded,
            "Anomaly detection service started"
        );
    }

    /// Log the startup load outcome, with full detail on failure
    pub fn log_model_load(&self, path: &str, handle: &ModelHandle) {
        match (handle.info(), handle.failure_reason()) {
            (Some(info), _) => {
                info!(
                    event = "model_loaded",
                    service = %self.service,
                    path = %path,
                    format = %info.format,
                    checksum = %info.checksum,
                    size_bytes = info.size_bytes,
                    "Model artifact loaded"
                );
            }
            (None, reason) => {
                error!(
                    event = "model_load_failed",
                    service = %self.service,
                    path = %path,
                    reason = %reason.unwrap_or("unknown"),
                    "Model artifact failed to load, prediction service will be non-functional"
                );
            }
        }
    }

    /// Log an inference failure with its internal detail
    pub fn log_inference_failure(&self, model: &str, detail: &str) {
        error!(
            event = "inference_failed",
            service = %self.service,
            model = %model,
            detail = %detail,
            "Prediction failed due to internal error"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Anomaly detection service shutting down"
        );
    }
}
