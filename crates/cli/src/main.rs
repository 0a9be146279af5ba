//! Anomaly Detection CLI
//!
//! Trains the Isolation Forest artifact offline and talks to a running
//! detection service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, predict, train};
use std::path::PathBuf;

/// Anomaly Detection CLI
#[derive(Parser)]
#[command(name = "adt")]
#[command(author, version, about = "CLI for the Anomaly Detection Service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via ADT_API_URL env var)
    #[arg(long, env = "ADT_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the model on synthetic traffic and write the artifact
    Train {
        /// Artifact path; `.json` for the native forest format
        #[arg(long, short, default_value = "anomaly_detector.json")]
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value_t = detector_lib::training::DEFAULT_SEED)]
        seed: u64,

        /// Number of trees
        #[arg(long, default_value_t = 100)]
        trees: usize,

        /// Subsample size per tree
        #[arg(long, default_value_t = 256)]
        max_samples: usize,

        /// Expected share of anomalies in the training data
        #[arg(long, default_value_t = 0.02, conflicts_with = "auto_offset")]
        contamination: f64,

        /// Use the fixed -0.5 offset instead of fitting one to the contamination
        #[arg(long)]
        auto_offset: bool,
    },

    /// Classify a single observation
    Predict {
        /// CPU usage feature
        #[arg(allow_hyphen_values = true)]
        cpu_usage: f64,

        /// Memory load feature
        #[arg(allow_hyphen_values = true)]
        memory_load: f64,
    },

    /// Show service health; exits non-zero when the model is not loaded
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train {
            output,
            seed,
            trees,
            max_samples,
            contamination,
            auto_offset,
        } => {
            let options = train::TrainOptions {
                seed,
                trees,
                max_samples,
                contamination: (!auto_offset).then_some(contamination),
            };
            train::train_model(&output, &options, cli.format)?;
        }
        Commands::Predict {
            cpu_usage,
            memory_load,
        } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            predict::predict(&client, cpu_usage, memory_load, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            if !health::show_health(&client, cli.format).await? {
                anyhow::bail!("Service is not ready");
            }
        }
    }

    Ok(())
}
