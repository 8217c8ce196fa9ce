//! API client for communicating with the forecast agent

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use forecast_lib::{MetricSummary, Sample, TickReport};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the forecast agent
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

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Push one sample and get the resulting tick report
    pub async fn push_sample(
        &self,
        metric: &str,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<TickReport> {
        self.post(
            &format!("api/v1/metrics/{metric}/samples"),
            &SampleRequest { timestamp, value },
        )
        .await
    }

    /// Seed a metric's window with historical samples
    pub async fn push_history(&self, metric: &str, samples: Vec<Sample>) -> Result<HistoryResponse> {
        self.post(
            &format!("api/v1/metrics/{metric}/history"),
            &HistoryRequest { samples },
        )
        .await
    }

    pub async fn report(&self, metric: &str) -> Result<TickReport> {
        self.get(&format!("api/v1/metrics/{metric}/report")).await
    }

    pub async fn list_metrics(&self) -> Result<MetricsList> {
        self.get("api/v1/metrics").await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub metric: String,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsList {
    pub metrics: Vec<MetricSummary>,
}
