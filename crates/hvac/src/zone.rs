//! One control cycle for one zone: decide from the windowed average,
//! then drive the actuators.

use std::time::Duration;

use thermofleet_core::telemetry::TelemetryQuery;
use thermofleet_core::types::{ActuatorRef, Credentials, ZoneDescriptor};
use thermofleet_device::{DeviceSession, SessionError, Transport};

use crate::controller::{decide, ControlError, ControlMode};

/// Actuator connections get one attempt; a failed toggle is retried
/// naturally on the next control pass.
const ACTUATOR_CONNECT_ATTEMPTS: u32 = 1;

/// Tuning for zone control cycles, derived from the fleet
/// configuration.
#[derive(Debug, Clone)]
pub struct ZoneCycleOptions {
    /// Lookback window for the zone average.
    pub window: Duration,
    /// Minimum readings behind the average before acting on it.
    pub min_samples: u32,
    /// Deadline for one actuator connection attempt.
    pub connect_timeout: Duration,
}

/// What one zone cycle did.
#[derive(Debug, Clone, Copy)]
pub struct ZoneCycleReport {
    pub average_c: f64,
    pub desired_on: bool,
    pub actuators_driven: usize,
    pub actuators_failed: usize,
}

/// Run one control cycle for `zone`.
///
/// Parses the zone's mode, reads the windowed average over its sensor
/// machines, gates on the minimum sample count, then commands every
/// actuator to the decided state. An individual actuator failure is
/// logged and counted, never aborting the rest of the zone; errors
/// returned here are zone-scoped and leave sibling zones untouched.
pub async fn run_zone_cycle(
    transport: &dyn Transport,
    query: &dyn TelemetryQuery,
    zone: &ZoneDescriptor,
    credentials: &Credentials,
    opts: &ZoneCycleOptions,
) -> Result<ZoneCycleReport, ControlError> {
    let mode = ControlMode::parse(&zone.mode)?;

    let average = query
        .average_over(&zone.sensor_machines, opts.window)
        .await?;

    if average.sample_count < opts.min_samples {
        return Err(ControlError::InsufficientSamples {
            got: average.sample_count,
            need: opts.min_samples,
        });
    }

    let desired_on = decide(mode, average.mean_c, zone.target_temp_c);
    tracing::info!(
        zone = %zone.name,
        average_c = average.mean_c,
        target_c = zone.target_temp_c,
        desired_on,
        "Zone state decided",
    );

    let mut failed = 0;
    for actuator in &zone.actuators {
        match drive_actuator(
            transport,
            actuator,
            credentials,
            &zone.actuator_command,
            desired_on,
            opts,
        )
        .await
        {
            Ok(()) => {
                tracing::info!(
                    zone = %zone.name,
                    machine_id = %actuator.machine_id,
                    on = desired_on,
                    "Actuator adjusted",
                );
            }
            Err(e) => {
                tracing::warn!(
                    zone = %zone.name,
                    machine_id = %actuator.machine_id,
                    error = %e,
                    "Actuator command failed",
                );
                failed += 1;
            }
        }
    }

    Ok(ZoneCycleReport {
        average_c: average.mean_c,
        desired_on,
        actuators_driven: zone.actuators.len() - failed,
        actuators_failed: failed,
    })
}

/// Open a session to one actuator machine, issue the command, close.
async fn drive_actuator(
    transport: &dyn Transport,
    actuator: &ActuatorRef,
    credentials: &Credentials,
    command: &str,
    on: bool,
    opts: &ZoneCycleOptions,
) -> Result<(), SessionError> {
    let mut session = DeviceSession::connect(
        transport,
        &actuator.machine_id,
        &actuator.address,
        credentials,
        opts.connect_timeout,
        ACTUATOR_CONNECT_ATTEMPTS,
    )
    .await?;

    let outcome = session.set_actuator(command, on).await;
    session.close().await;
    outcome
}
