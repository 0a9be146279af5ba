//! ONNX artifacts executed with tract
//!
//! The graph takes a `[1, 2]` f32 input (CPU usage, memory load). Its first
//! output is read as either an integer label (`-1`/`1`) or a real-valued
//! decision score where negative values mean anomaly.

use super::AnomalyModel;
use crate::error::LoadError;
use crate::models::{AnomalyScore, FeatureVector, NUM_FEATURES};
use anyhow::{bail, Context, Result};
use tract_onnx::prelude::*;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-backed anomaly model
pub struct OnnxModel {
    model: TractModel,
}

impl OnnxModel {
    /// Parse and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, LoadError> {
        let model =
            Self::load_model(model_bytes).map_err(|e| LoadError::Onnx(format!("{:#}", e)))?;
        Ok(Self { model })
    }

    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn features_to_tensor(features: &FeatureVector) -> Result<Tensor> {
        let data: Vec<f32> = features.as_array().iter().map(|&v| v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .context("Failed to shape input tensor")?;
        Ok(array.into())
    }
}

/// Interpret the first value of the model output
fn output_to_score(value: f64) -> Result<AnomalyScore> {
    if !value.is_finite() {
        bail!("model produced a non-finite output");
    }
    Ok(if value < 0.0 {
        AnomalyScore::Anomaly
    } else {
        AnomalyScore::Normal
    })
}

impl AnomalyModel for OnnxModel {
    fn score(&self, features: &FeatureVector) -> Result<AnomalyScore> {
        let input = Self::features_to_tensor(features)?;

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;

        let values = output.cast_to::<f64>()?;
        let first = values
            .as_slice::<f64>()?
            .first()
            .copied()
            .context("Model output is empty")?;

        output_to_score(first)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_fail_to_load() {
        let result = OnnxModel::from_bytes(b"definitely not a protobuf graph");
        assert!(matches!(result, Err(LoadError::Onnx(_))));
    }

    #[test]
    fn test_output_labels() {
        assert_eq!(output_to_score(-1.0).unwrap(), AnomalyScore::Anomaly);
        assert_eq!(output_to_score(1.0).unwrap(), AnomalyScore::Normal);
    }

    #[test]
    fn test_output_decision_scores() {
        assert_eq!(output_to_score(-0.03).unwrap(), AnomalyScore::Anomaly);
        assert_eq!(output_to_score(0.0).unwrap(), AnomalyScore::Normal);
        assert_eq!(output_to_score(0.12).unwrap(), AnomalyScore::Normal);
        assert!(output_to_score(f64::NAN).is_err());
    }
}
