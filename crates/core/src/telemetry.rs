//! Trait seams for the central telemetry service.
//!
//! The poller pushes one [`SensorResult`](crate::types::SensorResult)
//! per cycle through [`Uploader`]; the zone controller reads
//! time-windowed averages back through [`TelemetryQuery`]. Both seams
//! are implemented over HTTP in `thermofleet-telemetry` and by
//! in-memory fakes in tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors pushing a reading to the telemetry service.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The request itself failed (network, DNS, TLS, etc.).
    #[error("upload request failed: {0}")]
    Request(String),

    /// The service returned a non-success status.
    #[error("telemetry service rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Errors querying the telemetry service for a windowed average.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("telemetry query failed: {0}")]
    Request(String),

    #[error("telemetry service returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sink for per-cycle sensor results.
///
/// One uploader is shared by every machine loop, so implementations
/// must tolerate concurrent calls.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Push one reading set for `part_id`. Fields always include at
    /// least a `temp` key.
    async fn upload(
        &self,
        part_id: &str,
        captured_at: DateTime<Utc>,
        fields: &HashMap<String, f64>,
    ) -> Result<(), UploadError>;
}

/// Mean of recent `temp` readings across a set of machines.
#[derive(Debug, Clone, Copy)]
pub struct WindowedAverage {
    pub mean_c: f64,
    /// How many readings back the mean. Callers gate on this before
    /// trusting the average.
    pub sample_count: u32,
}

/// Read side of the telemetry service, used by zone control.
#[async_trait]
pub trait TelemetryQuery: Send + Sync {
    /// Average `temp` over readings captured within `window` across
    /// the given machines.
    async fn average_over(
        &self,
        machine_ids: &[String],
        window: Duration,
    ) -> Result<WindowedAverage, QueryError>;
}
