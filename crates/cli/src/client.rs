//! API client for communicating with the detection service

use anyhow::{Context, Result};
use detector_lib::{ErrorBody, HealthResponse, PredictionRequest, PredictionResponse};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the detection service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Send one feature vector to `/predict`
    pub async fn predict(&self, cpu_usage: f64, memory_load: f64) -> Result<PredictionResponse> {
        let url = self.base_url.join("predict").context("Invalid path")?;
        let request = PredictionRequest {
            data: vec![cpu_usage, memory_load],
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request")?;

        parse_success(response).await
    }

    /// Fetch `/health`. A 503 still carries a health body, so it is not an error here.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("health").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        response.json().await.context("Failed to parse response")
    }
}

async fn parse_success<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Prefer the service's own error message when the body is well formed
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|error| error.error)
            .unwrap_or(body);
        anyhow::bail!("API error ({}): {}", status, message);
    }

    response.json().await.context("Failed to parse response")
}
