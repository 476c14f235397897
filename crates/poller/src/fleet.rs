//! Fleet scheduler: one supervised, indefinitely-repeating poll loop
//! per machine.
//!
//! Loops are spawned tokio tasks with no cross-machine
//! synchronization; a slow or failing machine never delays its
//! siblings. Each cycle's outcome is reported back to the daemon
//! through an mpsc channel rather than existing only as log output.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use thermofleet_core::telemetry::Uploader;
use thermofleet_core::types::{MachineDescriptor, SensorResult};
use thermofleet_device::Transport;

use crate::cycle::{poll_once, PollError, PollOptions};

/// Slack added on top of the device's own sleep window, so the next
/// cycle starts after the device has woken back up.
const INTER_CYCLE_MARGIN: Duration = Duration::from_secs(5);

/// Report channel capacity.
const REPORT_CHANNEL_CAPACITY: usize = 256;

/// Tuning for the whole fleet.
#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// Pause between one machine's cycles (the device's sleep window).
    pub interval: Duration,
    /// Cycles per machine before its loop exits; `None` runs forever.
    pub iterations: Option<u64>,
    pub poll: PollOptions,
}

/// Outcome of one cycle on one machine.
#[derive(Debug)]
pub struct CycleReport {
    pub part_id: String,
    /// 0-based cycle counter within this machine's loop.
    pub iteration: u64,
    pub outcome: Result<SensorResult, PollError>,
}

/// A started fleet: the report stream plus the per-machine task
/// handles.
pub struct FleetRun {
    pub reports: mpsc::Receiver<CycleReport>,
    pub handles: Vec<JoinHandle<()>>,
}

/// Spawns and supervises the per-machine poll loops.
pub struct FleetScheduler {
    transport: Arc<dyn Transport>,
    uploader: Arc<dyn Uploader>,
    cancel: CancellationToken,
}

impl FleetScheduler {
    pub fn new(transport: Arc<dyn Transport>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            transport,
            uploader,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled by [`shutdown`](Self::shutdown); clone it to
    /// tie external signals to the fleet's lifetime.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop all machine loops before their next cycle. In-flight
    /// cycles finish best-effort.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Spawn one poll loop per machine.
    ///
    /// The returned receiver yields every cycle's outcome; it closes
    /// once all loops have exited (bounded-iteration mode or
    /// shutdown).
    pub fn start(&self, machines: Vec<MachineDescriptor>, opts: FleetOptions) -> FleetRun {
        let (report_tx, reports) = mpsc::channel(REPORT_CHANNEL_CAPACITY);

        tracing::info!(count = machines.len(), "Starting fleet");

        let handles = machines
            .into_iter()
            .map(|machine| {
                let transport = Arc::clone(&self.transport);
                let uploader = Arc::clone(&self.uploader);
                let opts = opts.clone();
                let cancel = self.cancel.child_token();
                let report_tx = report_tx.clone();

                tokio::spawn(async move {
                    machine_loop(transport, uploader, machine, opts, cancel, report_tx).await;
                })
            })
            .collect();

        FleetRun { reports, handles }
    }
}

/// One machine's poll loop: strictly sequential cycles, paced by the
/// configured interval, until cancelled or the iteration bound is hit.
async fn machine_loop(
    transport: Arc<dyn Transport>,
    uploader: Arc<dyn Uploader>,
    machine: MachineDescriptor,
    opts: FleetOptions,
    cancel: CancellationToken,
    report_tx: mpsc::Sender<CycleReport>,
) {
    let mut iteration: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        tracing::info!(part_id = %machine.part_id, iteration, "Starting poll cycle");

        let outcome = poll_once(
            transport.as_ref(),
            uploader.as_ref(),
            &machine,
            &opts.poll,
        )
        .await;

        if let Err(e) = &outcome {
            tracing::warn!(part_id = %machine.part_id, iteration, error = %e, "Poll cycle failed");
        }

        let _ = report_tx
            .send(CycleReport {
                part_id: machine.part_id.clone(),
                iteration,
                outcome,
            })
            .await;

        iteration += 1;
        if let Some(bound) = opts.iterations {
            if iteration >= bound {
                break;
            }
        }

        // No sleep after a terminal iteration; here we are mid-run.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(opts.interval + INTER_CYCLE_MARGIN) => {}
        }
    }

    tracing::info!(part_id = %machine.part_id, "Machine loop exited");
}
