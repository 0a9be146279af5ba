//! HTTP API for predictions, health checks and Prometheus metrics

use crate::error::ApiResult;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use detector_lib::{
    DetectorMetrics, HealthReporter, InferenceEngine, ModelHandle, PredictionResponse,
    StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Version reported by the health endpoint
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: InferenceEngine,
    pub health: HealthReporter,
}

impl AppState {
    pub fn new(
        handle: Arc<ModelHandle>,
        service_name: &str,
        metrics: DetectorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            engine: InferenceEngine::new(handle.clone(), metrics, logger),
            health: HealthReporter::new(handle, service_name, SERVICE_VERSION),
        }
    }
}

/// Prediction endpoint - body `{"data": [cpu_usage, memory_load]}`
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<PredictionResponse>> {
    let (features, score) = state.engine.predict_payload(&body)?;
    Ok(Json(PredictionResponse::new(&features, score)))
}

/// Health check response - returns 200 if the model is loaded, 503 otherwise
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.health();

    let status_code = StatusCode::from_u16(health.status.http_status())
        .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);

    (status_code, Json(health))
}

/// Liveness probe - 200 whenever the HTTP layer is up
async fn livez(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health.liveness())
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/livez", get(livez))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
