//! Isolation Forest artifact
//!
//! Trees are stored as flat node arrays with children always placed after
//! their parent, so traversal of a validated tree always terminates.
//!
//! Scoring:
//! - path length of a sample in a tree is the depth of the leaf it reaches plus
//!   `c(leaf.size)`, the expected path length of the unsplit remainder
//! - `score_samples = -2^(-mean_path_length / c(max_samples))`
//! - `decision = score_samples - offset`, negative decisions are anomalies

use super::AnomalyModel;
use crate::error::LoadError;
use crate::models::{AnomalyScore, FeatureVector, NUM_FEATURES};
use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Current artifact format version
pub const FORMAT_VERSION: u32 = 1;

/// Offset used when no contamination ratio is given
const AUTO_OFFSET: f64 = -0.5;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful search in a binary search tree
/// built from `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Training parameters
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the number of samples)
    pub max_samples: usize,
    /// Expected share of anomalies in the training data; `None` uses a fixed offset
    pub contamination: Option<f64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: Some(0.02),
        }
    }
}

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// A single isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<Node>,
}

impl IsolationTree {
    /// Path length of a sample through this tree
    pub fn path_length(&self, sample: &[f64]) -> Result<f64> {
        let mut index = 0;
        let mut depth = 0usize;

        loop {
            let node = self
                .nodes
                .get(index)
                .with_context(|| format!("node index {} out of range", index))?;

            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = sample
                        .get(*feature)
                        .with_context(|| format!("feature index {} out of range", feature))?;
                    index = if *value <= *threshold { *left } else { *right };
                    depth += 1;
                }
                Node::Leaf { size } => return Ok(depth as f64 + average_path_length(*size)),
            }
        }
    }

    fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(format!(
                        "node {} splits on feature {} but artifact has {} features",
                        index, feature, n_features
                    ));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has a non-finite threshold", index));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child index {}", index, child));
                    }
                }
            }
        }

        Ok(())
    }

    fn grow<R: Rng + ?Sized>(
        samples: &[Vec<f64>],
        indices: &[usize],
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        let mut nodes = Vec::new();
        Self::grow_node(samples, indices, 0, max_depth, rng, &mut nodes);
        Self { nodes }
    }

    fn grow_node<R: Rng + ?Sized>(
        samples: &[Vec<f64>],
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut R,
        nodes: &mut Vec<Node>,
    ) -> usize {
        let index = nodes.len();
        nodes.push(Node::Leaf {
            size: indices.len(),
        });

        if depth >= max_depth || indices.len() <= 1 {
            return index;
        }

        // Try features in random order, skipping ones that are constant here
        let n_features = samples[indices[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        for feature in features {
            let (min, max) = indices
                .iter()
                .map(|&i| samples[i][feature])
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });

            if min >= max {
                continue;
            }

            let threshold = rng.gen_range(min..max);
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| samples[i][feature] <= threshold);

            let left = Self::grow_node(samples, &left, depth + 1, max_depth, rng, nodes);
            let right = Self::grow_node(samples, &right, depth + 1, max_depth, rng, nodes);
            nodes[index] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };
            return index;
        }

        index
    }
}

/// Serialized Isolation Forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    pub format_version: u32,
    pub n_features: usize,
    pub max_samples: usize,
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

impl IsolationForest {
    /// Parse and validate a JSON artifact for the two-feature service model
    pub fn from_json(bytes: &[u8]) -> std::result::Result<Self, LoadError> {
        let forest: Self = serde_json::from_slice(bytes)?;
        forest.validate().map_err(LoadError::InvalidArtifact)?;

        if forest.n_features != NUM_FEATURES {
            return Err(LoadError::InvalidArtifact(format!(
                "artifact expects {} features, service provides {}",
                forest.n_features, NUM_FEATURES
            )));
        }

        Ok(forest)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Structural checks that make scoring total
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.n_features == 0 {
            return Err("artifact declares zero features".to_string());
        }
        if self.max_samples < 2 {
            return Err(format!("max_samples must be at least 2, got {}", self.max_samples));
        }
        if !self.offset.is_finite() {
            return Err("offset is not finite".to_string());
        }
        if self.trees.is_empty() {
            return Err("artifact has no trees".to_string());
        }

        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", index, e))?;
        }

        Ok(())
    }

    /// Raw anomaly score in `[-1, 0)`; lower is more anomalous
    pub fn score_samples(&self, sample: &[f64]) -> Result<f64> {
        if sample.len() != self.n_features {
            bail!(
                "sample has {} features, model expects {}",
                sample.len(),
                self.n_features
            );
        }
        if self.trees.is_empty() {
            bail!("forest has no trees");
        }

        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.path_length(sample)?;
        }
        let mean_path_length = total / self.trees.len() as f64;

        Ok(-(2f64.powf(-mean_path_length / average_path_length(self.max_samples))))
    }

    /// Score shifted by the fitted offset; negative means anomaly
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64> {
        Ok(self.score_samples(sample)? - self.offset)
    }

    pub fn predict(&self, sample: &[f64]) -> Result<AnomalyScore> {
        let decision = self.decision_function(sample)?;
        Ok(if decision < 0.0 {
            AnomalyScore::Anomaly
        } else {
            AnomalyScore::Normal
        })
    }

    /// Fit a forest on training samples
    pub fn fit<R: Rng + ?Sized>(
        samples: &[Vec<f64>],
        config: &ForestConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if samples.len() < 2 {
            bail!("need at least 2 training samples, got {}", samples.len());
        }
        if config.n_estimators == 0 {
            bail!("n_estimators must be positive");
        }
        if config.max_samples < 2 {
            bail!("max_samples must be at least 2, got {}", config.max_samples);
        }
        if let Some(contamination) = config.contamination {
            if !(contamination > 0.0 && contamination <= 0.5) {
                bail!("contamination must be in (0, 0.5], got {}", contamination);
            }
        }

        let n_features = samples[0].len();
        if n_features == 0 {
            bail!("training samples have no features");
        }
        if let Some(bad) = samples
            .iter()
            .position(|s| s.len() != n_features || s.iter().any(|v| !v.is_finite()))
        {
            bail!("training sample {} is malformed", bad);
        }

        let max_samples = config.max_samples.min(samples.len());
        let max_depth = (max_samples as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let subsample = rand::seq::index::sample(rng, samples.len(), max_samples).into_vec();
            trees.push(IsolationTree::grow(samples, &subsample, max_depth, rng));
        }

        let mut forest = Self {
            format_version: FORMAT_VERSION,
            n_features,
            max_samples,
            offset: AUTO_OFFSET,
            trees,
        };

        if let Some(contamination) = config.contamination {
            let mut scores = samples
                .iter()
                .map(|s| forest.score_samples(s))
                .collect::<Result<Vec<_>>>()?;
            scores.sort_by(|a, b| a.total_cmp(b));
            forest.offset = percentile(&scores, contamination * 100.0);
        }

        Ok(forest)
    }
}

impl AnomalyModel for IsolationForest {
    fn score(&self, features: &FeatureVector) -> Result<AnomalyScore> {
        self.predict(&features.as_array())
    }

    fn name(&self) -> &str {
        "isolation_forest"
    }
}

/// Linearly interpolated percentile of sorted values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
