//! Service configuration

use anyhow::Result;
use config::{Config, Environment, File};
use detector_lib::model::DEFAULT_MAX_MODEL_SIZE;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable prefix, e.g. `DETECTOR_MODEL_PATH`
pub const ENV_PREFIX: &str = "DETECTOR";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Name reported by the health endpoint
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Model artifact path; `.onnx` selects the ONNX backend
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Expected SHA256 of the artifact (hex)
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Artifacts larger than this are refused
    #[serde(default = "default_max_model_size")]
    pub max_model_size_bytes: u64,
}

fn default_service_name() -> String {
    "Containerized Anomaly Detection API".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("anomaly_detector.json")
}

fn default_max_model_size() -> u64 {
    DEFAULT_MAX_MODEL_SIZE
}

impl DetectorConfig {
    /// Load configuration from an optional `detector.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("detector").required(false))
            .add_source(environment)
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// `host:port` to bind
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert(key.to_string(), value.to_string());
        }
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::from_environment(env(&[])).unwrap();

        assert_eq!(config.api_port, 8000);
        assert_eq!(config.model_path, PathBuf::from("anomaly_detector.json"));
        assert_eq!(config.model_sha256, None);
        assert_eq!(config.max_model_size_bytes, DEFAULT_MAX_MODEL_SIZE);
        assert_eq!(config.listen_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_environment_overrides() {
        let config = DetectorConfig::from_environment(env(&[
            ("DETECTOR_API_PORT", "9100"),
            ("DETECTOR_MODEL_PATH", "/models/detector.onnx"),
            ("DETECTOR_MODEL_SHA256", "abc123"),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 9100);
        assert_eq!(config.model_path, PathBuf::from("/models/detector.onnx"));
        assert_eq!(config.model_sha256.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        assert!(DetectorConfig::from_environment(env(&[("DETECTOR_API_PORT", "not-a-port")])).is_err());
    }
}
