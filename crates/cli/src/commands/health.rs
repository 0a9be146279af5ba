//! Service health check

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_success, print_warning, OutputFormat};

/// Print service health. Returns whether the service is ready.
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<bool> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!("Service:      {}", health.service.cyan());
            println!("Version:      {}", health.version);
            println!("Status:       {}", color_status(health.status));
            println!("Model loaded: {}", health.model_loaded);
            if let Some(model_format) = health.model_format {
                println!("Model format: {}", model_format);
            }
            println!("Checked at:   {}", format_timestamp(health.checked_at));
            println!();

            if health.ready {
                print_success(&health.message);
            } else {
                print_warning(&health.message);
            }
        }
    }

    Ok(health.ready)
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
