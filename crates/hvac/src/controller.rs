//! The threshold control law.

use thermofleet_core::telemetry::QueryError;

/// Errors aborting one zone's control cycle. Always scoped to a
/// single zone.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The zone's configured mode string is not a known mode.
    #[error("unrecognized control mode '{0}'")]
    InvalidMode(String),

    #[error("zone average query failed: {0}")]
    Query(#[from] QueryError),

    /// Too few recent readings behind the zone average to act on it.
    #[error("zone average based on {got} samples, need at least {need}")]
    InsufficientSamples { got: u32, need: u32 },
}

/// Whether a zone's actuators add or remove heat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Heat,
    Cool,
}

impl ControlMode {
    /// Parse a configured mode string. Anything but `heat` / `cool`
    /// is a configuration error, never silently defaulted.
    pub fn parse(mode: &str) -> Result<Self, ControlError> {
        match mode {
            "heat" => Ok(Self::Heat),
            "cool" => Ok(Self::Cool),
            other => Err(ControlError::InvalidMode(other.to_string())),
        }
    }
}

/// Decide the binary actuator state for a zone.
///
/// Pure two-branch threshold law, no hysteresis band: heating runs at
/// or below target, cooling at or above. Exactly at the target the
/// actuator is commanded ON in both modes, so it can chatter right at
/// the setpoint; that boundary behavior is deliberate and load-bearing
/// for existing zones.
pub fn decide(mode: ControlMode, sensed_c: f64, target_c: f64) -> bool {
    match mode {
        ControlMode::Heat => sensed_c <= target_c,
        ControlMode::Cool => sensed_c >= target_c,
    }
}
