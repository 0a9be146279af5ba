//! Offline training of the Isolation Forest artifact
//!
//! Used by the `adt train` command, never by the running service. The
//! synthetic data set simulates CPU usage and memory load: two tight clusters
//! of normal activity plus a small number of scattered anomalies.

use crate::model::{ForestConfig, IsolationForest};
use crate::models::AnomalyScore;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 42;

/// Normal points drawn per cluster
const NORMAL_POINTS: usize = 1000;

/// Scattered anomalous points
const ABNORMAL_POINTS: usize = 20;

/// Spread of each normal cluster
const CLUSTER_SPREAD: f64 = 0.3;

/// Cluster centers are at (+CENTER, +CENTER) and (-CENTER, -CENTER)
const CLUSTER_CENTER: f64 = 2.0;

/// Anomalies are uniform in [-ANOMALY_RANGE, ANOMALY_RANGE) on both axes
const ANOMALY_RANGE: f64 = 6.0;

/// Probe points checked after training: (features, expected score)
pub const SELF_CHECK_POINTS: [([f64; 2], AnomalyScore); 2] = [
    ([2.1, 2.1], AnomalyScore::Normal),
    ([-5.0, 5.0], AnomalyScore::Anomaly),
];

/// Standard normal draw (Box-Muller)
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps the logarithm finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Generate the synthetic training set
pub fn synthetic_traffic<R: Rng + ?Sized>(rng: &mut R) -> Vec<Vec<f64>> {
    let mut base = Vec::with_capacity(NORMAL_POINTS);
    for _ in 0..NORMAL_POINTS {
        let x = CLUSTER_SPREAD * standard_normal(rng);
        let y = CLUSTER_SPREAD * standard_normal(rng);
        base.push([x, y]);
    }

    let mut samples = Vec::with_capacity(2 * NORMAL_POINTS + ABNORMAL_POINTS);
    samples.extend(base.iter().map(|[x, y]| vec![x + CLUSTER_CENTER, y + CLUSTER_CENTER]));
    samples.extend(base.iter().map(|[x, y]| vec![x - CLUSTER_CENTER, y - CLUSTER_CENTER]));

    for _ in 0..ABNORMAL_POINTS {
        samples.push(vec![
            rng.gen_range(-ANOMALY_RANGE..ANOMALY_RANGE),
            rng.gen_range(-ANOMALY_RANGE..ANOMALY_RANGE),
        ]);
    }

    samples
}

/// Train a forest on the synthetic data set
pub fn train(config: &ForestConfig, seed: u64) -> Result<IsolationForest> {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = synthetic_traffic(&mut rng);

    info!(
        samples = samples.len(),
        trees = config.n_estimators,
        max_samples = config.max_samples,
        contamination = ?config.contamination,
        seed = seed,
        "Training Isolation Forest model"
    );

    let forest = IsolationForest::fit(&samples, config, &mut rng)?;
    info!(offset = forest.offset, "Training complete");
    Ok(forest)
}

/// Run the probe points through a forest
pub fn self_check(forest: &IsolationForest) -> Result<Vec<([f64; 2], AnomalyScore, AnomalyScore)>> {
    let mut results = Vec::with_capacity(SELF_CHECK_POINTS.len());
    for (point, expected) in SELF_CHECK_POINTS {
        results.push((point, expected, forest.predict(&point)?));
    }
    Ok(results)
}

/// Write the artifact to disk, returning the bytes written.
/// Writes a temp file first and renames it into place.
pub fn save_artifact(forest: &IsolationForest, path: &Path) -> Result<Vec<u8>> {
    let bytes = forest
        .to_json_pretty()
        .context("Failed to serialize model artifact")?
        .into_bytes();

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp model file {:?}", temp_path))?;

    file.write_all(&bytes)
        .context("Failed to write model artifact")?;
    file.sync_all().context("Failed to sync model file")?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(bytes)
}
