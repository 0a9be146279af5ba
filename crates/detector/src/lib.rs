//! Anomaly detection HTTP service
//!
//! Serves the model loaded at startup over `/predict`, with `/health`,
//! `/livez` and `/metrics` for orchestration and monitoring.

pub mod api;
pub mod config;
pub mod error;

pub use api::{create_router, serve, AppState, SERVICE_VERSION};
pub use config::DetectorConfig;
pub use error::{ApiError, ApiResult};
