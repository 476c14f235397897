//! `thermofleet-hvac` -- zone control daemon.
//!
//! Loads the fleet configuration and repeats a control pass over all
//! configured zones at a fixed interval until interrupted. Zones are
//! independent: one zone's failure never skips its siblings.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default      | Description            |
//! |----------------------|----------|--------------|------------------------|
//! | `THERMOFLEET_CONFIG` | no       | `fleet.json` | Path to the config doc |
//! | `RUST_LOG`           | no       | per-crate    | Tracing filter         |

use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thermofleet_core::config::FleetConfig;
use thermofleet_hvac::{run_zone_cycle, ZoneCycleOptions};
use thermofleet_telemetry::TelemetryClient;
use thermofleet_transport::WsTransport;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "thermofleet_hvac=info,thermofleet_device=info,thermofleet_transport=info".into()
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

    if config.zones.is_empty() {
        tracing::error!("No zones configured, nothing to control");
        std::process::exit(1);
    }

    let credentials = match &config.hvac {
        Some(hvac) => hvac.credentials(),
        None => {
            tracing::error!("Zones are configured but 'hvac' credentials are missing");
            std::process::exit(1);
        }
    };

    tracing::info!(
        zones = config.zones.len(),
        control_interval_secs = config.control_interval_secs,
        "Configuration loaded",
    );

    let transport = WsTransport::new();
    let query = TelemetryClient::new(&config.app);

    let opts = ZoneCycleOptions {
        window: config.average_window(),
        min_samples: config.min_zone_samples,
        connect_timeout: config.connect_timeout(),
    };

    loop {
        for zone in &config.zones {
            match run_zone_cycle(&transport, &query, zone, &credentials, &opts).await {
                Ok(report) => {
                    tracing::info!(
                        zone = %zone.name,
                        average_c = report.average_c,
                        desired_on = report.desired_on,
                        actuators_driven = report.actuators_driven,
                        actuators_failed = report.actuators_failed,
                        "Zone control cycle complete",
                    );
                }
                Err(e) => {
                    tracing::error!(zone = %zone.name, error = %e, "Zone control cycle failed");
                }
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, stopping zone control");
                break;
            }
            _ = tokio::time::sleep(config.control_interval()) => {}
        }
    }
}
