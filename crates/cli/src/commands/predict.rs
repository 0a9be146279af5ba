//! Send a single observation to the service

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_score, format_point, print_json, OutputFormat};

pub async fn predict(
    client: &ApiClient,
    cpu_usage: f64,
    memory_load: f64,
    format: OutputFormat,
) -> Result<()> {
    let result = client.predict(cpu_usage, memory_load).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Prediction".bold());
            println!("{}", "=".repeat(50));
            println!("Input:  {}", format_point(&result.input_data));
            println!("Result: {}", color_score(result.prediction_score));
            println!();
            println!("{}", result.message.dimmed());
        }
    }

    Ok(())
}
