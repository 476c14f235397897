//! Fleet configuration document.
//!
//! One JSON file supplies everything both daemons need: the machine
//! list, the zone list, telemetry service credentials, and the tuning
//! knobs for polling and control. Loaded once at process start;
//! changing it requires a restart.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{Credentials, MachineDescriptor, ZoneDescriptor};

/// Seconds a device is asked to sleep between poll cycles.
const DEFAULT_SLEEP_SECS: u64 = 180;
/// Samples taken per poll cycle for noise reduction.
const DEFAULT_NUM_READINGS: usize = 10;
/// Seconds allowed for one connection attempt.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;
/// Minimum telemetry samples behind a zone average.
const DEFAULT_MIN_ZONE_SAMPLES: u32 = 5;
/// Lookback window for zone averages.
const DEFAULT_WINDOW_SECS: u64 = 3600;
/// Seconds between zone control passes.
const DEFAULT_CONTROL_INTERVAL_SECS: u64 = 300;

/// Telemetry service endpoint and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryServiceConfig {
    /// Base HTTP URL, e.g. `https://telemetry.example.com`.
    pub base_url: String,
    pub api_name: String,
    pub api_key: String,
}

/// Credential pair assumed valid for every actuator machine.
#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorCredentials {
    pub api_name: String,
    pub api_key: String,
}

impl ActuatorCredentials {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            name: self.api_name.clone(),
            key: self.api_key.clone(),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    pub app: TelemetryServiceConfig,
    pub machines: Vec<MachineDescriptor>,
    #[serde(default)]
    pub zones: Vec<ZoneDescriptor>,
    /// Required when `zones` is non-empty.
    #[serde(default)]
    pub hvac: Option<ActuatorCredentials>,
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,
    #[serde(default = "default_num_readings")]
    pub num_readings: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_min_zone_samples")]
    pub min_zone_samples: u32,
    #[serde(default = "default_window_secs")]
    pub average_window_secs: u64,
    #[serde(default = "default_control_interval_secs")]
    pub control_interval_secs: u64,
}

fn default_sleep_secs() -> u64 {
    DEFAULT_SLEEP_SECS
}

fn default_num_readings() -> usize {
    DEFAULT_NUM_READINGS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_min_zone_samples() -> u32 {
    DEFAULT_MIN_ZONE_SAMPLES
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

fn default_control_interval_secs() -> u64 {
    DEFAULT_CONTROL_INTERVAL_SECS
}

/// Errors loading or parsing the configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FleetConfig {
    /// Load and parse the configuration document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a configuration document from a JSON string.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn average_window(&self) -> Duration {
        Duration::from_secs(self.average_window_secs)
    }

    pub fn control_interval(&self) -> Duration {
        Duration::from_secs(self.control_interval_secs)
    }
}
