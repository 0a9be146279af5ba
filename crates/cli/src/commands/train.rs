//! Offline training of the Isolation Forest artifact

use anyhow::{Context, Result};
use colored::Colorize;
use detector_lib::model::{compute_checksum, ForestConfig};
use detector_lib::{training, AnomalyScore, ModelLoader};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_score, format_bytes, format_point, print_info, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Training run parameters
pub struct TrainOptions {
    pub seed: u64,
    pub trees: usize,
    pub max_samples: usize,
    pub contamination: Option<f64>,
}

/// Row for the self-check table
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Point")]
    point: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Predicted")]
    predicted: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Serialize)]
struct CheckResult {
    point: [f64; 2],
    expected: AnomalyScore,
    predicted: AnomalyScore,
}

#[derive(Serialize)]
struct TrainSummary {
    path: String,
    checksum: String,
    size_bytes: u64,
    trees: usize,
    max_samples: usize,
    offset: f64,
    seed: u64,
    self_check: Vec<CheckResult>,
}

/// Train on synthetic traffic, write the artifact and verify it loads
pub fn train_model(output: &Path, options: &TrainOptions, format: OutputFormat) -> Result<()> {
    let config = ForestConfig {
        n_estimators: options.trees,
        max_samples: options.max_samples,
        contamination: options.contamination,
    };

    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "Training {} trees on synthetic traffic (seed {})",
            config.n_estimators, options.seed
        ));
    }

    let forest = training::train(&config, options.seed)?;
    let checks = training::self_check(&forest)?;
    let bytes = training::save_artifact(&forest, output)?;

    // Read it back the same way the service will
    let handle = ModelLoader::new(output).load();
    if !handle.is_loaded() {
        anyhow::bail!(
            "Written artifact failed to load: {}",
            handle.failure_reason().unwrap_or("unknown error")
        );
    }

    let summary = TrainSummary {
        path: output.display().to_string(),
        checksum: compute_checksum(&bytes),
        size_bytes: bytes.len() as u64,
        trees: forest.trees.len(),
        max_samples: forest.max_samples,
        offset: forest.offset,
        seed: options.seed,
        self_check: checks
            .iter()
            .map(|(point, expected, predicted)| CheckResult {
                point: *point,
                expected: *expected,
                predicted: *predicted,
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&summary).context("Failed to render summary")?,
        OutputFormat::Table => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &TrainSummary) {
    println!();
    println!("{}", "Model Artifact".bold());
    println!("{}", "=".repeat(50));
    println!("Path:        {}", summary.path.cyan());
    println!("SHA256:      {}", summary.checksum);
    println!("Size:        {}", format_bytes(summary.size_bytes));
    println!("Trees:       {}", summary.trees);
    println!("Max samples: {}", summary.max_samples);
    println!("Offset:      {:.6}", summary.offset);
    println!();

    let rows: Vec<CheckRow> = summary
        .self_check
        .iter()
        .map(|check| CheckRow {
            point: format_point(&check.point),
            expected: color_score(check.expected),
            predicted: color_score(check.predicted),
            result: if check.expected == check.predicted {
                "ok".green().to_string()
            } else {
                "mismatch".red().to_string()
            },
        })
        .collect();
    print_table(&rows);

    if summary
        .self_check
        .iter()
        .any(|check| check.expected != check.predicted)
    {
        print_warning("Self-check predictions differ from the expected labels");
    } else {
        print_success("Model trained and saved");
    }
}
