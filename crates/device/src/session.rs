//! Device session lifecycle: bounded-retry connect, analog series
//! sampling, low-power scheduling, actuator commands, idempotent
//! close.
//!
//! A [`DeviceSession`] is exclusively owned by the poll cycle or zone
//! control call that opened it. Callers close it on every exit path;
//! `close` is idempotent so duplicate calls on error paths are
//! harmless.

use std::time::Duration;

use tokio::time::sleep;

use thermofleet_core::types::{Credentials, MachineDescriptor};

use crate::transport::{DeviceChannel, Transport, TransportError};

/// Wait before the sensor's supply voltage is considered stable.
const STABILIZATION_DELAY: Duration = Duration::from_secs(1);
/// Spacing between consecutive analog samples.
const INTER_SAMPLE_DELAY: Duration = Duration::from_millis(10);
/// Raw analog units map to degrees C as `(raw - 500) / 10`.
const RAW_MIDPOINT: i64 = 500;
const RAW_UNITS_PER_DEGREE: f64 = 10.0;
/// Supervising deadline for the low-power request. The device drops
/// the connection once it accepts, so the call is not expected to
/// return within this window.
const SLEEP_SUPERVISE_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Every connection attempt failed; carries the last underlying
    /// transport error.
    #[error("connection to {part_id} failed after {attempts} attempts: {source}")]
    ConnectionFailed {
        part_id: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Zero samples were successfully read in a sampling pass.
    #[error("no samples collected from {part_id}")]
    NoSamples { part_id: String },

    /// A device command failed on an open session.
    #[error("command '{command}' on {part_id} failed: {source}")]
    CommandFailed {
        part_id: String,
        command: String,
        #[source]
        source: TransportError,
    },
}

/// Outcome of a low-power request.
///
/// The expected path is [`Suspended`](SleepOutcome::Suspended): the
/// device stops answering inside the supervising window because it
/// accepted the request and went down. Callers never need to inspect
/// error types to recognize that path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The supervising deadline expired (or the transport reported its
    /// own deadline) -- the device is asleep.
    Suspended,
    /// The device acknowledged and stayed reachable.
    Acknowledged,
}

/// A live connection to one machine.
pub struct DeviceSession {
    channel: Box<dyn DeviceChannel>,
    part_id: String,
    closed: bool,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("part_id", &self.part_id)
            .field("closed", &self.closed)
            .finish()
    }
}

impl DeviceSession {
    /// Open a session against `machine`, retrying up to `max_retries`
    /// times with linearly increasing delays: the first attempt runs
    /// immediately, retry k waits k seconds first. Each attempt is
    /// bounded by `timeout`. Exhausting all attempts surfaces the last
    /// transport error as [`SessionError::ConnectionFailed`].
    pub async fn open(
        transport: &dyn Transport,
        machine: &MachineDescriptor,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, SessionError> {
        Self::connect(
            transport,
            &machine.part_id,
            &machine.address,
            &machine.credentials(),
            timeout,
            max_retries,
        )
        .await
    }

    /// [`open`](Self::open) for callers that address a device without
    /// a full descriptor (zone actuators share one credential pair).
    pub async fn connect(
        transport: &dyn Transport,
        part_id: &str,
        address: &str,
        credentials: &Credentials,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, SessionError> {
        let mut last: Option<TransportError> = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                sleep(Duration::from_secs(u64::from(attempt))).await;
            }

            match transport.connect(address, credentials, timeout).await {
                Ok(channel) => {
                    tracing::info!(part_id, attempt = attempt + 1, "Connected to machine");
                    return Ok(Self {
                        channel,
                        part_id: part_id.to_string(),
                        closed: false,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        part_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Connection attempt failed",
                    );
                    last = Some(e);
                }
            }
        }

        Err(SessionError::ConnectionFailed {
            part_id: part_id.to_string(),
            attempts: max_retries,
            source: last.unwrap_or_else(|| {
                TransportError::Channel("no connection attempts were made".to_string())
            }),
        })
    }

    /// Part id of the machine this session is bound to.
    pub fn part_id(&self) -> &str {
        &self.part_id
    }

    /// Take `count` analog samples from `channel`, powered by `line`.
    ///
    /// Energizes the line, waits for the supply to stabilize, then
    /// samples with a fixed spacing, converting each raw value to
    /// degrees C. An individual failed read is skipped, never retried.
    /// The line is de-energized again before this returns, whatever
    /// the outcome. Zero successful reads fail with
    /// [`SessionError::NoSamples`].
    pub async fn read_analog_series(
        &mut self,
        line: &str,
        channel: &str,
        count: usize,
    ) -> Result<Vec<f64>, SessionError> {
        self.channel
            .set_line(line, true)
            .await
            .map_err(|source| self.command_failed("line.set", source))?;

        sleep(STABILIZATION_DELAY).await;

        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            match self.channel.read_analog(channel).await {
                Ok(raw) => {
                    let temp_c = (raw - RAW_MIDPOINT) as f64 / RAW_UNITS_PER_DEGREE;
                    tracing::debug!(part_id = %self.part_id, sample = i, temp_c, "Sample");
                    samples.push(temp_c);
                }
                Err(e) => {
                    tracing::warn!(
                        part_id = %self.part_id,
                        sample = i,
                        error = %e,
                        "Failed to read sample, skipping",
                    );
                }
            }
            sleep(INTER_SAMPLE_DELAY).await;
        }

        // Sampling never early-returns above, so this is the single
        // release point for the line. A failed release is logged and
        // otherwise ignored.
        if let Err(e) = self.channel.set_line(line, false).await {
            tracing::warn!(part_id = %self.part_id, error = %e, "Failed to release power line");
        }

        if samples.is_empty() {
            return Err(SessionError::NoSamples {
                part_id: self.part_id.clone(),
            });
        }

        Ok(samples)
    }

    /// Ask the device to suspend for `duration`.
    ///
    /// The call is supervised by a short deadline: the device drops
    /// the connection mid-call when it accepts, so the deadline
    /// expiring -- or the transport reporting its own deadline -- is
    /// the success signal, returned as [`SleepOutcome::Suspended`].
    /// Any other transport error is a real failure.
    pub async fn set_low_power_until(
        &mut self,
        duration: Duration,
    ) -> Result<SleepOutcome, SessionError> {
        match tokio::time::timeout(SLEEP_SUPERVISE_TIMEOUT, self.channel.suspend(duration)).await {
            Err(_elapsed) => Ok(SleepOutcome::Suspended),
            Ok(Ok(())) => Ok(SleepOutcome::Acknowledged),
            Ok(Err(TransportError::Timeout)) => Ok(SleepOutcome::Suspended),
            Ok(Err(source)) => Err(self.command_failed("power.sleep", source)),
        }
    }

    /// Issue a named boolean command to the device.
    pub async fn set_actuator(&mut self, name: &str, on: bool) -> Result<(), SessionError> {
        self.channel
            .set_actuator(name, on)
            .await
            .map_err(|source| self.command_failed(name, source))
    }

    /// Release the underlying connection. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.channel.close().await;
        tracing::debug!(part_id = %self.part_id, "Session closed");
    }

    fn command_failed(&self, command: &str, source: TransportError) -> SessionError {
        SessionError::CommandFailed {
            part_id: self.part_id.clone(),
            command: command.to_string(),
            source,
        }
    }
}
