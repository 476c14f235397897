//! Descriptors for machines and zones, plus the per-cycle sensor
//! result handed to the uploader.
//!
//! Descriptors are loaded once from the configuration document and
//! treated as read-only for the process lifetime; there is no live
//! reload (re-initialization is a restart).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque name + secret pair used to authenticate against one device
/// or against the telemetry service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub name: String,
    pub key: String,
}

/// One remote sensor/actuator unit addressed over the transport.
///
/// Immutable once loaded. `address` and the API credentials are never
/// mutated after configuration load.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineDescriptor {
    /// Opaque part identifier, used as the telemetry key for this
    /// machine and as the log tag for its failures.
    pub part_id: String,
    /// Network address of the device's RPC endpoint.
    pub address: String,
    pub api_name: String,
    pub api_key: String,
    /// Additive correction applied after filtering, in degrees C.
    #[serde(default)]
    pub temp_offset_c: f64,
    /// Digital line that powers the sensor while sampling.
    #[serde(default = "default_power_line")]
    pub power_line: String,
    /// Analog channel the temperature sensor reports on.
    #[serde(default = "default_analog_channel")]
    pub analog_channel: String,
}

fn default_power_line() -> String {
    "12".to_string()
}

fn default_analog_channel() -> String {
    "temp".to_string()
}

impl MachineDescriptor {
    /// Credential pair for this machine's transport handshake.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            name: self.api_name.clone(),
            key: self.api_key.clone(),
        }
    }
}

/// Reference to an actuator machine inside a zone.
#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorRef {
    pub machine_id: String,
    pub address: String,
}

/// A logical grouping of sensor machines (for averaging) and actuator
/// machines (for control) sharing one target temperature and mode.
///
/// `mode` stays a free-form string here; it is validated when the
/// zone's control cycle starts, so a bad mode disables that zone only.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneDescriptor {
    /// Log tag for this zone.
    pub name: String,
    /// Part ids of the sensor machines whose recent readings are
    /// averaged for this zone.
    pub sensor_machines: Vec<String>,
    pub actuators: Vec<ActuatorRef>,
    pub target_temp_c: f64,
    /// `"heat"` or `"cool"`.
    pub mode: String,
    /// Named boolean command understood by the zone's actuators.
    #[serde(default = "default_actuator_command")]
    pub actuator_command: String,
}

fn default_actuator_command() -> String {
    "AC_ON".to_string()
}

/// Result of one successful poll cycle against one machine.
///
/// Handed to the uploader and not retained internally.
#[derive(Debug, Clone, Serialize)]
pub struct SensorResult {
    pub part_id: String,
    /// Robust mean of the sample batch, before calibration.
    pub filtered_c: f64,
    /// `filtered_c` plus the machine's calibration offset. This is the
    /// value reported under the `temp` field.
    pub final_c: f64,
    pub captured_at: DateTime<Utc>,
}
