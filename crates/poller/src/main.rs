//! `thermofleet-poller` -- temperature polling daemon.
//!
//! Loads the fleet configuration, connects the shared telemetry
//! client, and runs one supervised poll loop per configured machine
//! until interrupted.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default      | Description            |
//! |----------------------|----------|--------------|------------------------|
//! | `THERMOFLEET_CONFIG` | no       | `fleet.json` | Path to the config doc |
//! | `RUST_LOG`           | no       | per-crate    | Tracing filter         |

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thermofleet_core::config::FleetConfig;
use thermofleet_poller::{FleetOptions, FleetScheduler, PollOptions};
use thermofleet_telemetry::TelemetryClient;
use thermofleet_transport::WsTransport;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "thermofleet_poller=info,thermofleet_device=info,thermofleet_transport=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path =
        std::env::var("THERMOFLEET_CONFIG").unwrap_or_else(|_| "fleet.json".to_string());

    let config = match FleetConfig::load(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(
        machines = config.machines.len(),
        sleep_secs = config.sleep_secs,
        num_readings = config.num_readings,
        "Configuration loaded",
    );

    let transport = Arc::new(WsTransport::new());
    let uploader = Arc::new(TelemetryClient::new(&config.app));
    let scheduler = FleetScheduler::new(transport, uploader);

    let opts = FleetOptions {
        interval: config.sleep_duration(),
        iterations: None,
        poll: PollOptions {
            num_readings: config.num_readings,
            sleep_for: config.sleep_duration(),
            connect_timeout: config.connect_timeout(),
        },
    };

    let mut run = scheduler.start(config.machines.clone(), opts);

    let cancel = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping fleet");
            cancel.cancel();
        }
    });

    while let Some(report) = run.reports.recv().await {
        match report.outcome {
            Ok(result) => {
                tracing::info!(
                    part_id = %report.part_id,
                    iteration = report.iteration,
                    temp_c = result.final_c,
                    "Cycle complete",
                );
            }
            Err(e) => {
                tracing::warn!(
                    part_id = %report.part_id,
                    iteration = report.iteration,
                    error = %e,
                    "Cycle failed",
                );
            }
        }
    }

    for handle in run.handles {
        let _ = handle.await;
    }

    tracing::info!("Fleet stopped");
}
