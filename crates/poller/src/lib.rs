//! `thermofleet-poller` -- per-machine poll cycles and the fleet
//! scheduler that fans them out.
//!
//! [`cycle`] runs one sample-filter-upload-sleep pass against one
//! machine; [`fleet`] keeps an independent, indefinitely-repeating
//! loop of those passes running per configured machine. The binary
//! entrypoint lives in `main.rs`.

pub mod cycle;
pub mod fleet;

pub use cycle::{poll_once, PollError, PollOptions};
pub use fleet::{CycleReport, FleetOptions, FleetRun, FleetScheduler};
