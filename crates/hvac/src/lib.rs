//! `thermofleet-hvac` -- zone threshold control.
//!
//! [`controller`] holds the pure on/off decision law; [`zone`] runs
//! one control cycle for a zone, deciding from the telemetry average
//! and driving the zone's actuators to the decided state. The binary
//! entrypoint lives in `main.rs`.

pub mod controller;
pub mod zone;

pub use controller::{decide, ControlError, ControlMode};
pub use zone::{run_zone_cycle, ZoneCycleOptions, ZoneCycleReport};
