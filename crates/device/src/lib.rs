//! `thermofleet-device` -- per-machine connection lifecycle.
//!
//! [`transport`] defines the RPC channel seam the rest of the
//! workspace talks through; [`session`] owns the connect/retry/close
//! lifecycle and the sampling and power-state operations on top of an
//! open channel.

pub mod session;
pub mod transport;

pub use session::{DeviceSession, SessionError, SleepOutcome};
pub use transport::{DeviceChannel, Transport, TransportError};
