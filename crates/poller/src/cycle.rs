//! One poll cycle against one machine: connect, sample, filter,
//! upload, schedule sleep.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;

use thermofleet_core::filter::{robust_mean, FilterError};
use thermofleet_core::telemetry::{UploadError, Uploader};
use thermofleet_core::types::{MachineDescriptor, SensorResult};
use thermofleet_device::{DeviceSession, SessionError, SleepOutcome, Transport};

/// Connection attempts per cycle.
const SESSION_RETRIES: u32 = 5;

/// Tuning for one poll cycle, derived from the fleet configuration.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Samples per cycle.
    pub num_readings: usize,
    /// How long the device is asked to sleep after a successful cycle.
    pub sleep_for: Duration,
    /// Deadline for one connection attempt.
    pub connect_timeout: Duration,
}

/// Errors aborting one poll cycle. Always scoped to a single machine.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("sample filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
}

/// Run one full poll cycle against `machine`.
///
/// Opens a session (with retry), samples an analog series, filters it,
/// applies the machine's calibration offset, uploads the result, and
/// finally asks the device to sleep until the next cycle. Any failure
/// aborts the cycle for this machine only; the session is closed on
/// every path. On a sampling or upload failure the device is left
/// awake until the next cycle -- sleep is only scheduled after a fully
/// successful pass.
pub async fn poll_once(
    transport: &dyn Transport,
    uploader: &dyn Uploader,
    machine: &MachineDescriptor,
    opts: &PollOptions,
) -> Result<SensorResult, PollError> {
    tracing::info!(part_id = %machine.part_id, "Connecting to machine");

    let mut session =
        DeviceSession::open(transport, machine, opts.connect_timeout, SESSION_RETRIES).await?;

    let outcome = sample_and_report(&mut session, uploader, machine, opts).await;
    session.close().await;
    outcome
}

/// Cycle body between session open and close, so `poll_once` has a
/// single close point for every path.
async fn sample_and_report(
    session: &mut DeviceSession,
    uploader: &dyn Uploader,
    machine: &MachineDescriptor,
    opts: &PollOptions,
) -> Result<SensorResult, PollError> {
    let samples = session
        .read_analog_series(&machine.power_line, &machine.analog_channel, opts.num_readings)
        .await?;

    let filtered_c = robust_mean(&samples)?;
    let result = SensorResult {
        part_id: machine.part_id.clone(),
        filtered_c,
        final_c: filtered_c + machine.temp_offset_c,
        captured_at: Utc::now(),
    };

    tracing::info!(part_id = %result.part_id, temp_c = result.final_c, "Temperature sampled");

    let mut fields = HashMap::new();
    fields.insert("temp".to_string(), result.final_c);
    uploader
        .upload(&result.part_id, result.captured_at, &fields)
        .await?;

    match session.set_low_power_until(opts.sleep_for).await? {
        SleepOutcome::Suspended => {
            tracing::info!(part_id = %result.part_id, "Device suspended until next cycle");
        }
        SleepOutcome::Acknowledged => {
            tracing::debug!(part_id = %result.part_id, "Device acknowledged low-power request");
        }
    }

    Ok(result)
}
