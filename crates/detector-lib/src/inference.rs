//! Inference engine
//!
//! Runs validated feature vectors through the loaded model. Model errors and
//! panics are caught here and turned into [`DetectorError::Inference`]; the
//! detail only goes to the log.

use crate::error::{DetectorError, DetectorResult, ErrorKind};
use crate::model::ModelHandle;
use crate::models::{AnomalyScore, FeatureVector};
use crate::observability::{DetectorMetrics, StructuredLogger};
use crate::validation::validate_payload;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Executes predictions against the process-wide model handle
#[derive(Clone)]
pub struct InferenceEngine {
    handle: Arc<ModelHandle>,
    metrics: DetectorMetrics,
    logger: StructuredLogger,
}

impl InferenceEngine {
    pub fn new(handle: Arc<ModelHandle>, metrics: DetectorMetrics, logger: StructuredLogger) -> Self {
        Self {
            handle,
            metrics,
            logger,
        }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Validate a raw request body, then predict
    pub fn predict_payload(&self, body: &[u8]) -> DetectorResult<(FeatureVector, AnomalyScore)> {
        let features = validate_payload(body).map_err(|e| {
            self.metrics.inc_errors(ErrorKind::Validation);
            DetectorError::from(e)
        })?;

        let score = self.predict(&features)?;
        Ok((features, score))
    }

    /// Score a validated feature vector
    pub fn predict(&self, features: &FeatureVector) -> DetectorResult<AnomalyScore> {
        let model = match self.handle.model() {
            Some(model) => model,
            None => {
                self.metrics.inc_errors(ErrorKind::ModelUnavailable);
                return Err(DetectorError::ModelUnavailable);
            }
        };

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.score(features)));
        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());

        let detail = match outcome {
            Ok(Ok(score)) => {
                self.metrics.inc_predictions(score);
                debug!(
                    elapsed_us = elapsed.as_micros() as u64,
                    score = score.as_i8(),
                    "Inference completed"
                );
                return Ok(score);
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("model panicked: {}", panic_message(payload.as_ref())),
        };

        self.logger.log_inference_failure(model.name(), &detail);
        self.metrics.inc_errors(ErrorKind::Inference);
        Err(DetectorError::Inference(detail))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnomalyModel, ArtifactFormat, ForestConfig, IsolationForest, ModelInfo};
    use crate::training::{synthetic_traffic, DEFAULT_SEED};
    use anyhow::{anyhow, Result};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Anomaly when CPU usage is negative; counts invocations
    #[derive(Default)]
    struct SignModel {
        calls: AtomicUsize,
    }

    impl AnomalyModel for SignModel {
        fn score(&self, features: &FeatureVector) -> Result<AnomalyScore> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if features.cpu_usage < 0.0 {
                AnomalyScore::Anomaly
            } else {
                AnomalyScore::Normal
            })
        }

        fn name(&self) -> &str {
            "sign"
        }
    }

    struct FailingModel;

    impl AnomalyModel for FailingModel {
        fn score(&self, _features: &FeatureVector) -> Result<AnomalyScore> {
            Err(anyhow!("shape mismatch: expected [1, 4], got [1, 2]"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingModel;

    impl AnomalyModel for PanickingModel {
        fn score(&self, _features: &FeatureVector) -> Result<AnomalyScore> {
            panic!("index out of bounds in tree 3");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn info() -> ModelInfo {
        ModelInfo {
            format: ArtifactFormat::Forest,
            checksum: "test".to_string(),
            size_bytes: 0,
            loaded_at: 0,
        }
    }

    fn engine_with(model: Arc<dyn AnomalyModel>) -> InferenceEngine {
        InferenceEngine::new(
            Arc::new(ModelHandle::loaded(model, info())),
            DetectorMetrics::new(),
            StructuredLogger::new("test"),
        )
    }

    #[test]
    fn test_unavailable_model() {
        let engine = InferenceEngine::new(
            Arc::new(ModelHandle::unavailable("missing")),
            DetectorMetrics::new(),
            StructuredLogger::new("test"),
        );
        let features = FeatureVector::new(1.0, 1.0).unwrap();

        for _ in 0..3 {
            assert!(matches!(
                engine.predict(&features),
                Err(DetectorError::ModelUnavailable)
            ));
        }
    }

    #[test]
    fn test_validation_happens_before_model() {
        let model = Arc::new(SignModel::default());
        let engine = engine_with(model.clone());

        let bodies: [&[u8]; 4] = [
            br#"{"data": [2.1]}"#,
            br#"{"data": ["x", 2.1]}"#,
            br#"{"data": [1e999, 2.1]}"#,
            b"{}",
        ];
        for body in bodies {
            assert!(matches!(
                engine.predict_payload(body),
                Err(DetectorError::Validation(_))
            ));
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        let (features, score) = engine.predict_payload(br#"{"data": [-1.0, 0.5]}"#).unwrap();
        assert_eq!(features.as_array(), [-1.0, 0.5]);
        assert_eq!(score, AnomalyScore::Anomaly);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_model_error_becomes_inference_error() {
        let engine = engine_with(Arc::new(FailingModel));
        let features = FeatureVector::new(1.0, 1.0).unwrap();

        match engine.predict(&features) {
            Err(e @ DetectorError::Inference(_)) => {
                assert!(e.to_string().contains("shape mismatch"));
                assert!(!e.public_message().contains("shape mismatch"));
            }
            other => panic!("expected inference error, got {:?}", other),
        }
    }

    #[test]
    fn test_model_panic_is_contained() {
        let engine = engine_with(Arc::new(PanickingModel));
        let features = FeatureVector::new(1.0, 1.0).unwrap();

        match engine.predict(&features) {
            Err(DetectorError::Inference(detail)) => {
                assert!(detail.contains("index out of bounds in tree 3"));
            }
            other => panic!("expected inference error, got {:?}", other),
        }

        // The engine keeps serving after a panic
        assert!(engine.predict(&features).is_err());
    }

    #[test]
    fn test_predictions_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
        let samples = synthetic_traffic(&mut rng);
        let config = ForestConfig {
            n_estimators: 50,
            ..ForestConfig::default()
        };
        let forest = IsolationForest::fit(&samples, &config, &mut rng).unwrap();
        let engine = engine_with(Arc::new(forest));

        for (cpu, mem) in [(2.1, 2.1), (-5.5, 5.2), (0.0, 0.0), (-2.3, -1.7), (4.0, -4.0)] {
            let features = FeatureVector::new(cpu, mem).unwrap();
            let first = engine.predict(&features).unwrap();
            for _ in 0..5 {
                assert_eq!(engine.predict(&features).unwrap(), first);
            }
        }
    }

    #[test]
    fn test_concurrent_predictions_are_independent() {
        let engine = engine_with(Arc::new(SignModel::default()));

        std::thread::scope(|scope| {
            let anomalies = scope.spawn(|| {
                (0..200)
                    .map(|i| {
                        let features = FeatureVector::new(-1.0 - i as f64, 1.0).unwrap();
                        engine.predict(&features).unwrap()
                    })
                    .collect::<Vec<_>>()
            });
            let normals = scope.spawn(|| {
                (0..200)
                    .map(|i| {
                        let features = FeatureVector::new(1.0 + i as f64, 1.0).unwrap();
                        engine.predict(&features).unwrap()
                    })
                    .collect::<Vec<_>>()
            });

            assert!(anomalies
                .join()
                .unwrap()
                .iter()
                .all(|s| *s == AnomalyScore::Anomaly));
            assert!(normals
                .join()
                .unwrap()
                .iter()
                .all(|s| *s == AnomalyScore::Normal));
        });
    }
}
