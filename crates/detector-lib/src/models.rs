//! Core data models for the detection service

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of features the service accepts: CPU usage and memory load
pub const NUM_FEATURES: usize = 2;

/// Feature vector for a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub cpu_usage: f64,
    pub memory_load: f64,
}

impl FeatureVector {
    /// Build a feature vector, rejecting NaN and infinities
    pub fn new(cpu_usage: f64, memory_load: f64) -> Result<Self, ValidationError> {
        if !cpu_usage.is_finite() {
            return Err(ValidationError::NonFinite { index: 0 });
        }
        if !memory_load.is_finite() {
            return Err(ValidationError::NonFinite { index: 1 });
        }
        Ok(Self {
            cpu_usage,
            memory_load,
        })
    }

    /// Features in model input order
    pub fn as_array(&self) -> [f64; NUM_FEATURES] {
        [self.cpu_usage, self.memory_load]
    }
}

/// Discrete model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyScore {
    Anomaly,
    Normal,
}

impl AnomalyScore {
    /// Wire value: -1 for anomalies, 1 for normal traffic
    pub fn as_i8(self) -> i8 {
        match self {
            AnomalyScore::Anomaly => -1,
            AnomalyScore::Normal => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -1 => Some(AnomalyScore::Anomaly),
            1 => Some(AnomalyScore::Normal),
            _ => None,
        }
    }

    /// Human-readable status string returned alongside the score
    pub fn status(self) -> &'static str {
        match self {
            AnomalyScore::Anomaly => "Anomaly Detected",
            AnomalyScore::Normal => "Normal Traffic",
        }
    }

    /// Metric label for this outcome
    pub fn label(self) -> &'static str {
        match self {
            AnomalyScore::Anomaly => "anomaly",
            AnomalyScore::Normal => "normal",
        }
    }
}

impl Serialize for AnomalyScore {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for AnomalyScore {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        AnomalyScore::from_i64(value).ok_or_else(|| {
            serde::de::Error::custom(format!("prediction score must be -1 or 1, got {}", value))
        })
    }
}

/// Prediction request body as sent by callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub data: Vec<f64>,
}

/// Successful prediction response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub prediction_score: AnomalyScore,
    pub input_data: [f64; NUM_FEATURES],
    pub message: String,
}

impl PredictionResponse {
    pub fn new(features: &FeatureVector, score: AnomalyScore) -> Self {
        Self {
            status: score.status().to_string(),
            prediction_score: score,
            input_data: features.as_array(),
            message: "Prediction successful. Score of -1 indicates an anomaly.".to_string(),
        }
    }
}

/// Error response body for every non-2xx reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_rejects_non_finite() {
        assert_eq!(
            FeatureVector::new(f64::NAN, 1.0),
            Err(ValidationError::NonFinite { index: 0 })
        );
        assert_eq!(
            FeatureVector::new(1.0, f64::NEG_INFINITY),
            Err(ValidationError::NonFinite { index: 1 })
        );
        assert!(FeatureVector::new(-1e300, 1e300).is_ok());
    }

    #[test]
    fn test_anomaly_score_wire_format() {
        assert_eq!(serde_json::to_string(&AnomalyScore::Anomaly).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&AnomalyScore::Normal).unwrap(), "1");

        let parsed: AnomalyScore = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, AnomalyScore::Anomaly);
        assert!(serde_json::from_str::<AnomalyScore>("0").is_err());
    }

    #[test]
    fn test_prediction_response_fields() {
        let features = FeatureVector::new(-5.5, 5.2).unwrap();
        let response = PredictionResponse::new(&features, AnomalyScore::Anomaly);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["prediction_score"], -1);
        assert_eq!(json["status"], "Anomaly Detected");
        assert_eq!(json["input_data"][0], -5.5);
        assert_eq!(json["input_data"][1], 5.2);
    }
}
