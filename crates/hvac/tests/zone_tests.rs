//! Zone control cycle tests against fake telemetry and transport.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use thermofleet_core::telemetry::{QueryError, TelemetryQuery, WindowedAverage};
use thermofleet_core::types::{ActuatorRef, Credentials, ZoneDescriptor};
use thermofleet_device::{DeviceChannel, Transport, TransportError};
use thermofleet_hvac::{run_zone_cycle, ControlError, ZoneCycleOptions};

struct FakeQuery {
    result: Result<WindowedAverage, ()>,
    calls: Arc<Mutex<u32>>,
}

impl FakeQuery {
    fn returning(mean_c: f64, sample_count: u32) -> Self {
        Self {
            result: Ok(WindowedAverage {
                mean_c,
                sample_count,
            }),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            result: Err(()),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl TelemetryQuery for FakeQuery {
    async fn average_over(
        &self,
        _machine_ids: &[String],
        _window: Duration,
    ) -> Result<WindowedAverage, QueryError> {
        *self.calls.lock().unwrap() += 1;
        match self.result {
            Ok(average) => Ok(average),
            Err(()) => Err(QueryError::Rejected {
                status: 500,
                body: "aggregation failed".to_string(),
            }),
        }
    }
}

/// Transport recording actuator commands per address.
struct FakeTransport {
    refuse: HashSet<String>,
    commands: Arc<Mutex<Vec<(String, String, bool)>>>,
}

impl FakeTransport {
    fn new() -> Self {
        Self {
            refuse: HashSet::new(),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn refusing(mut self, address: &str) -> Self {
        self.refuse.insert(address.to_string());
        self
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(
        &self,
        address: &str,
        _credentials: &Credentials,
        _timeout: Duration,
    ) -> Result<Box<dyn DeviceChannel>, TransportError> {
        if self.refuse.contains(address) {
            return Err(TransportError::Connect {
                address: address.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Box::new(FakeChannel {
            address: address.to_string(),
            commands: Arc::clone(&self.commands),
        }))
    }
}

struct FakeChannel {
    address: String,
    commands: Arc<Mutex<Vec<(String, String, bool)>>>,
}

#[async_trait]
impl DeviceChannel for FakeChannel {
    async fn set_line(&mut self, _line: &str, _high: bool) -> Result<(), TransportError> {
        Ok(())
    }

    async fn read_analog(&mut self, _channel: &str) -> Result<i64, TransportError> {
        Err(TransportError::Rejected("no analog surface".to_string()))
    }

    async fn suspend(&mut self, _duration: Duration) -> Result<(), TransportError> {
        Err(TransportError::Rejected("no power surface".to_string()))
    }

    async fn set_actuator(&mut self, name: &str, on: bool) -> Result<(), TransportError> {
        self.commands
            .lock()
            .unwrap()
            .push((self.address.clone(), name.to_string(), on));
        Ok(())
    }

    async fn close(&mut self) {}
}

fn zone(mode: &str, target_temp_c: f64) -> ZoneDescriptor {
    ZoneDescriptor {
        name: "upstairs".to_string(),
        sensor_machines: vec!["m1".to_string(), "m2".to_string()],
        actuators: vec![
            ActuatorRef {
                machine_id: "hvac-1".to_string(),
                address: "wss://hvac-1.local".to_string(),
            },
            ActuatorRef {
                machine_id: "hvac-2".to_string(),
                address: "wss://hvac-2.local".to_string(),
            },
        ],
        target_temp_c,
        mode: mode.to_string(),
        actuator_command: "AC_ON".to_string(),
    }
}

fn credentials() -> Credentials {
    Credentials {
        name: "hvac-key-id".to_string(),
        key: "hvac-secret".to_string(),
    }
}

fn opts() -> ZoneCycleOptions {
    ZoneCycleOptions {
        window: Duration::from_secs(3600),
        min_samples: 5,
        connect_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn warm_zone_in_cool_mode_turns_actuators_on() {
    let transport = FakeTransport::new();
    let query = FakeQuery::returning(22.4, 12);

    let report = run_zone_cycle(&transport, &query, &zone("cool", 21.0), &credentials(), &opts())
        .await
        .unwrap();

    assert!(report.desired_on);
    assert_eq!(report.actuators_driven, 2);
    assert_eq!(report.actuators_failed, 0);

    let commands = transport.commands.lock().unwrap();
    assert_eq!(
        *commands,
        vec![
            ("wss://hvac-1.local".to_string(), "AC_ON".to_string(), true),
            ("wss://hvac-2.local".to_string(), "AC_ON".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn warm_zone_in_heat_mode_turns_actuators_off() {
    let transport = FakeTransport::new();
    let query = FakeQuery::returning(22.4, 12);

    let report = run_zone_cycle(&transport, &query, &zone("heat", 21.0), &credentials(), &opts())
        .await
        .unwrap();

    assert!(!report.desired_on);
    let commands = transport.commands.lock().unwrap();
    assert!(commands.iter().all(|(_, _, on)| !on));
}

#[tokio::test]
async fn thin_average_is_not_acted_on() {
    let transport = FakeTransport::new();
    let query = FakeQuery::returning(22.4, 3);

    let err = run_zone_cycle(&transport, &query, &zone("cool", 21.0), &credentials(), &opts())
        .await
        .expect_err("too few samples");

    assert_matches!(err, ControlError::InsufficientSamples { got: 3, need: 5 });
    assert!(transport.commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bad_mode_fails_before_querying_telemetry() {
    let transport = FakeTransport::new();
    let query = FakeQuery::returning(22.4, 12);

    let err = run_zone_cycle(
        &transport,
        &query,
        &zone("ventilate", 21.0),
        &credentials(),
        &opts(),
    )
    .await
    .expect_err("unknown mode");

    assert_matches!(err, ControlError::InvalidMode(mode) if mode == "ventilate");
    assert_eq!(*query.calls.lock().unwrap(), 0);
    assert!(transport.commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_actuator_does_not_block_its_sibling() {
    let transport = FakeTransport::new().refusing("wss://hvac-1.local");
    let query = FakeQuery::returning(22.4, 12);

    let report = run_zone_cycle(&transport, &query, &zone("cool", 21.0), &credentials(), &opts())
        .await
        .unwrap();

    assert_eq!(report.actuators_driven, 1);
    assert_eq!(report.actuators_failed, 1);

    let commands = transport.commands.lock().unwrap();
    assert_eq!(
        *commands,
        vec![("wss://hvac-2.local".to_string(), "AC_ON".to_string(), true)]
    );
}

#[tokio::test]
async fn query_failure_is_zone_scoped() {
    let transport = FakeTransport::new();
    let query = FakeQuery::failing();

    let err = run_zone_cycle(&transport, &query, &zone("cool", 21.0), &credentials(), &opts())
        .await
        .expect_err("telemetry down");

    assert_matches!(err, ControlError::Query(_));
    assert!(transport.commands.lock().unwrap().is_empty());
}
