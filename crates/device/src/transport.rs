//! RPC channel seam between the orchestrator and remote devices.
//!
//! The core never speaks a wire protocol itself. A [`Transport`]
//! produces an authenticated [`DeviceChannel`] for one machine; the
//! production implementation lives in `thermofleet-transport`, tests
//! supply scripted fakes.

use std::time::Duration;

use async_trait::async_trait;

use thermofleet_core::types::Credentials;

/// Errors at the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not establish or authenticate a connection.
    #[error("connect to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    /// The call did not complete within its deadline.
    #[error("device call timed out")]
    Timeout,

    /// The channel broke mid-call (closed, reset, decode failure).
    #[error("device channel error: {0}")]
    Channel(String),

    /// The device answered but refused the request.
    #[error("device rejected request: {0}")]
    Rejected(String),
}

/// Connection factory for remote machines.
///
/// One transport instance serves the whole fleet; it holds no
/// per-machine state.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish an authenticated channel to the device at `address`.
    /// The attempt is bounded by `timeout`.
    async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceChannel>, TransportError>;
}

/// An authenticated, exclusively-owned channel to one device.
///
/// Channels are never shared between concurrent operations; the
/// session that opened one closes it before returning.
#[async_trait]
pub trait DeviceChannel: Send {
    /// Drive a digital control line high or low.
    async fn set_line(&mut self, line: &str, high: bool) -> Result<(), TransportError>;

    /// Read one raw value from an analog channel.
    async fn read_analog(&mut self, channel: &str) -> Result<i64, TransportError>;

    /// Ask the device to power down for `duration`. The device drops
    /// the connection mid-call once it accepts, so this is expected to
    /// hang until a supervising deadline cancels it.
    async fn suspend(&mut self, duration: Duration) -> Result<(), TransportError>;

    /// Issue a named boolean command to a control surface.
    async fn set_actuator(&mut self, name: &str, on: bool) -> Result<(), TransportError>;

    /// Release the underlying connection.
    async fn close(&mut self);
}
