//! Anomaly Detector - Isolation Forest inference service
//!
//! Loads the model artifact once at startup and serves predictions over HTTP.
//! A missing or broken artifact does not stop the process; the health
//! endpoint reports the degraded state instead.

use anomaly_detector::{api, AppState, DetectorConfig, SERVICE_VERSION};
use anyhow::Result;
use detector_lib::{DetectorMetrics, ModelLoader, StructuredLogger};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting anomaly-detector");

    // Load configuration
    let config = DetectorConfig::load()?;
    info!(
        model_path = %config.model_path.display(),
        port = config.api_port,
        "Service configured"
    );

    let metrics = DetectorMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);

    // Load the model once, before any request can be accepted
    let handle = ModelLoader::new(&config.model_path)
        .with_expected_checksum(config.model_sha256.clone())
        .with_max_model_size(config.max_model_size_bytes)
        .load();
    logger.log_model_load(&config.model_path.display().to_string(), &handle);
    metrics.set_model_state(&handle);

    let handle = Arc::new(handle);
    let app_state = Arc::new(AppState::new(
        handle.clone(),
        &config.service_name,
        metrics,
        logger.clone(),
    ));

    logger.log_startup(SERVICE_VERSION, handle.is_loaded());

    api::serve(&config.listen_address(), app_state, shutdown_signal(logger)).await?;

    info!("Shutting down");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal(logger: StructuredLogger) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => "SIGINT received",
        _ = terminate => "SIGTERM received",
    };

    logger.log_shutdown(reason);
}
