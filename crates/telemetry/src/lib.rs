//! `thermofleet-telemetry` -- HTTP client for the central telemetry
//! service.
//!
//! Implements the [`Uploader`] and [`TelemetryQuery`] seams from
//! `thermofleet-core` over the service's REST surface using
//! [`reqwest`]. One client is created at daemon startup and shared by
//! every machine loop; `reqwest::Client` pools connections internally
//! and is safe for concurrent use.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use thermofleet_core::config::TelemetryServiceConfig;
use thermofleet_core::telemetry::{
    QueryError, TelemetryQuery, UploadError, Uploader, WindowedAverage,
};

/// HTTP client for the telemetry service.
pub struct TelemetryClient {
    client: reqwest::Client,
    base_url: String,
    api_name: String,
    api_key: String,
}

/// Response returned by the windowed-average endpoint.
#[derive(Debug, Deserialize)]
struct AverageResponse {
    mean: f64,
    sample_count: u32,
}

impl TelemetryClient {
    pub fn new(config: &TelemetryServiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_name: config.api_name.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling when
    /// several clients target the same host).
    pub fn with_client(client: reqwest::Client, config: &TelemetryServiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_name: config.api_name.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Uploader for TelemetryClient {
    async fn upload(
        &self,
        part_id: &str,
        captured_at: DateTime<Utc>,
        fields: &HashMap<String, f64>,
    ) -> Result<(), UploadError> {
        let body = serde_json::json!({
            "part_id": part_id,
            "captured_at": captured_at.to_rfc3339(),
            "readings": fields,
        });

        tracing::debug!(part_id, "Uploading readings");

        let response = self
            .client
            .post(format!("{}/v1/readings", self.base_url))
            .header("x-api-name", &self.api_name)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetryQuery for TelemetryClient {
    async fn average_over(
        &self,
        machine_ids: &[String],
        window: Duration,
    ) -> Result<WindowedAverage, QueryError> {
        let body = serde_json::json!({
            "machine_ids": machine_ids,
            "window_secs": window.as_secs(),
            "field": "temp",
        });

        let response = self
            .client
            .post(format!("{}/v1/readings/average", self.base_url))
            .header("x-api-name", &self.api_name)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let average: AverageResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Request(format!("malformed average response: {e}")))?;

        Ok(WindowedAverage {
            mean_c: average.mean,
            sample_count: average.sample_count,
        })
    }
}
