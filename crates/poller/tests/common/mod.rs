//! Shared fakes for poller tests: a scripted transport and an
//! in-memory uploader.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use thermofleet_core::telemetry::{UploadError, Uploader};
use thermofleet_core::types::{Credentials, MachineDescriptor};
use thermofleet_device::{DeviceChannel, Transport, TransportError};

/// Everything the fake transport records across all channels.
#[derive(Default)]
pub struct Recorded {
    /// Addresses in connection-attempt order.
    pub connects: Vec<String>,
    /// Requested sleep durations, in seconds.
    pub suspends: Vec<u64>,
    pub closes: u32,
}

pub struct FakeTransport {
    /// Addresses that always refuse connections.
    refuse: HashSet<String>,
    /// Per-sample script; once exhausted, `default_raw` applies.
    readings: Vec<Option<i64>>,
    /// Fallback raw value, or `None` to fail reads past the script.
    default_raw: Option<i64>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl FakeTransport {
    /// Transport where every read yields `raw`.
    pub fn steady(raw: i64) -> Self {
        Self {
            refuse: HashSet::new(),
            readings: Vec::new(),
            default_raw: Some(raw),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Transport following a per-sample script, then failing reads.
    pub fn scripted(readings: Vec<Option<i64>>) -> Self {
        Self {
            refuse: HashSet::new(),
            readings,
            default_raw: None,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Refuse every connection to `address`.
    pub fn refusing(mut self, address: &str) -> Self {
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
        self.recorded
            .lock()
            .unwrap()
            .connects
            .push(address.to_string());

        if self.refuse.contains(address) {
            return Err(TransportError::Connect {
                address: address.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        Ok(Box::new(FakeChannel {
            readings: self.readings.clone(),
            next: 0,
            default_raw: self.default_raw,
            recorded: Arc::clone(&self.recorded),
        }))
    }
}

struct FakeChannel {
    readings: Vec<Option<i64>>,
    next: usize,
    default_raw: Option<i64>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl DeviceChannel for FakeChannel {
    async fn set_line(&mut self, _line: &str, _high: bool) -> Result<(), TransportError> {
        Ok(())
    }

    async fn read_analog(&mut self, _channel: &str) -> Result<i64, TransportError> {
        let i = self.next;
        self.next += 1;
        match self.readings.get(i) {
            Some(Some(raw)) => Ok(*raw),
            Some(None) => Err(TransportError::Channel("read failed".to_string())),
            None => self
                .default_raw
                .ok_or_else(|| TransportError::Channel("read failed".to_string())),
        }
    }

    async fn suspend(&mut self, duration: Duration) -> Result<(), TransportError> {
        self.recorded.lock().unwrap().suspends.push(duration.as_secs());
        // The device goes down mid-call; the session's supervising
        // deadline turns this hang into the success signal.
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        Ok(())
    }

    async fn set_actuator(&mut self, _name: &str, _on: bool) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) {
        self.recorded.lock().unwrap().closes += 1;
    }
}

/// Uploader recording every push, optionally failing them all.
pub struct FakeUploader {
    fail: bool,
    pub uploads: Arc<Mutex<Vec<(String, HashMap<String, f64>)>>>,
}

impl FakeUploader {
    pub fn new() -> Self {
        Self {
            fail: false,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(
        &self,
        part_id: &str,
        _captured_at: DateTime<Utc>,
        fields: &HashMap<String, f64>,
    ) -> Result<(), UploadError> {
        if self.fail {
            return Err(UploadError::Rejected {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .push((part_id.to_string(), fields.clone()));
        Ok(())
    }
}

pub fn machine(part_id: &str, address: &str) -> MachineDescriptor {
    MachineDescriptor {
        part_id: part_id.to_string(),
        address: address.to_string(),
        api_name: "key-id".to_string(),
        api_key: "secret".to_string(),
        temp_offset_c: 0.0,
        power_line: "12".to_string(),
        analog_channel: "temp".to_string(),
    }
}
