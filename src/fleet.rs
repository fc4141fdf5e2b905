use crate::address::{DeviceAddress, SerialNumber};
use crate::bus;
use crate::command::{Command, CommandId};
use crate::error::{MercuryError, Result};
use crate::frame::{self, RequestFrame};
use crate::reading::{Reading, decode_payload};
use crate::store::{DeviceRecord, ReadingStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const SUPPORTED_MODELS: [&str; 1] = ["mercury200.02"];
pub const DEFAULT_MODEL: &str = "mercury200.02";
pub const DEFAULT_TOPIC: &str = "zigbee2mqtt/electricity_counter";

/// Registration record supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(rename = "device_serial")]
    pub serial: String,
    #[serde(rename = "type", default = "default_model")]
    pub model: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

impl DeviceConfig {
    #[must_use]
    pub fn new(serial: &str, topic: &str) -> Self {
        Self {
            serial: serial.to_string(),
            model: default_model(),
            topic: topic.to_string(),
        }
    }
}

/// A frame ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub serial: SerialNumber,
    /// Topic to publish on, already carrying the request suffix.
    pub topic: String,
    pub frame: Vec<u8>,
}

impl OutboundRequest {
    pub fn payload(&self) -> Result<String> {
        bus::encode_action(&self.frame)
    }
}

/// What happened to a frame that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Updated {
        serial: SerialNumber,
        reading: Reading,
    },
    /// Tariff response of all zeros; nothing stored.
    NoData { serial: SerialNumber },
    /// Command without a decoder.
    Ignored {
        serial: SerialNumber,
        command: CommandId,
    },
}

#[derive(Debug, Default)]
pub struct FrameStats {
    updated: AtomicU64,
    no_data: AtomicU64,
    ignored: AtomicU64,
    checksum_mismatch: AtomicU64,
    malformed: AtomicU64,
    unknown_device: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameCounts {
    pub updated: u64,
    pub no_data: u64,
    pub ignored: u64,
    pub checksum_mismatch: u64,
    pub malformed: u64,
    pub unknown_device: u64,
}

impl FrameStats {
    fn record(&self, result: &Result<FrameOutcome>) {
        let counter = match result {
            Ok(FrameOutcome::Updated { .. }) => &self.updated,
            Ok(FrameOutcome::NoData { .. }) => &self.no_data,
            Ok(FrameOutcome::Ignored { .. }) => &self.ignored,
            Err(MercuryError::ChecksumMismatch { .. }) => &self.checksum_mismatch,
            Err(MercuryError::UnknownDevice(_)) => &self.unknown_device,
            Err(_) => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counts(&self) -> FrameCounts {
        FrameCounts {
            updated: self.updated.load(Ordering::Relaxed),
            no_data: self.no_data.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            checksum_mismatch: self.checksum_mismatch.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unknown_device: self.unknown_device.load(Ordering::Relaxed),
        }
    }
}

/// Registered meters, owned by the host and passed wherever frames are built
/// or handled.
#[derive(Debug, Default)]
pub struct MeterFleet {
    store: Arc<ReadingStore>,
    by_serial: HashMap<SerialNumber, DeviceAddress>,
    stats: FrameStats,
}

impl MeterFleet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every config, collecting failures without stopping at the first.
    pub fn with_devices<'a>(
        configs: impl IntoIterator<Item = &'a DeviceConfig>,
    ) -> (Self, Vec<MercuryError>) {
        let mut fleet = Self::new();
        let mut errors = Vec::new();
        for config in configs {
            if let Err(e) = fleet.register(config) {
                tracing::error!("Rejected device '{}': {}", config.serial, e);
                errors.push(e);
            }
        }
        (fleet, errors)
    }

    /// Shared handle to the readings, for consumers on other threads.
    #[must_use]
    pub fn store(&self) -> Arc<ReadingStore> {
        self.store.clone()
    }

    #[must_use]
    pub fn stats(&self) -> FrameCounts {
        self.stats.counts()
    }

    pub fn register(&mut self, config: &DeviceConfig) -> Result<Arc<DeviceRecord>> {
        if !SUPPORTED_MODELS.contains(&config.model.as_str()) {
            return Err(MercuryError::UnsupportedDevice(config.model.clone()));
        }
        let serial = SerialNumber::new(config.serial.as_str())?;
        let address = serial.address()?;
        if self.by_serial.contains_key(&serial) {
            return Err(MercuryError::DuplicateDevice(serial.to_string()));
        }

        let record = DeviceRecord::new(serial.clone(), address, &config.model, &config.topic);
        let (record, inserted) = self.store.insert(record);
        if !inserted {
            tracing::error!(
                "Serial {} maps to address {} already used by {}",
                serial,
                address,
                record.serial
            );
            return Err(MercuryError::DuplicateDevice(serial.to_string()));
        }

        tracing::info!(
            "Registered {} {} at address {} on '{}'",
            record.model,
            serial,
            address,
            record.topic
        );
        self.by_serial.insert(serial, address);
        Ok(record)
    }

    #[must_use]
    pub fn device(&self, serial: &str) -> Option<Arc<DeviceRecord>> {
        let serial = SerialNumber::new(serial).ok()?;
        let address = self.by_serial.get(&serial)?;
        self.store.get(address)
    }

    #[must_use]
    pub fn devices(&self) -> Vec<Arc<DeviceRecord>> {
        self.store.records()
    }

    /// Build the request for a named command, e.g. `"get_status"`.
    pub fn request(&self, serial: &str, command: &str) -> Result<OutboundRequest> {
        let command: Command = command.parse()?;
        self.request_command(serial, command)
    }

    pub fn request_command(&self, serial: &str, command: Command) -> Result<OutboundRequest> {
        let record = self
            .device(serial)
            .ok_or_else(|| MercuryError::UnregisteredDevice(serial.to_string()))?;
        Ok(Self::outbound(&record, command))
    }

    /// Requests for every meter behind the modem on `topic`.
    pub fn request_by_topic(&self, topic: &str, command: &str) -> Result<Vec<OutboundRequest>> {
        let command: Command = command.parse()?;
        let requests: Vec<_> = self
            .devices()
            .iter()
            .filter(|record| record.topic == topic)
            .map(|record| Self::outbound(record, command))
            .collect();
        if requests.is_empty() {
            return Err(MercuryError::UnregisteredDevice(topic.to_string()));
        }
        Ok(requests)
    }

    /// One request per device and command, for periodic polling.
    #[must_use]
    pub fn poll_requests(&self, commands: &[Command]) -> Vec<OutboundRequest> {
        self.devices()
            .iter()
            .flat_map(|record| commands.iter().map(move |&c| Self::outbound(record, c)))
            .collect()
    }

    fn outbound(record: &DeviceRecord, command: Command) -> OutboundRequest {
        OutboundRequest {
            serial: record.serial.clone(),
            topic: bus::request_topic(&record.topic),
            frame: RequestFrame::new(record.address, command.id()).serialize(),
        }
    }

    /// Validate, decode and store one inbound frame.
    ///
    /// Every error here is frame-level: the frame is dropped, nothing is stored
    /// and the caller should carry on with the next frame.
    pub fn handle_frame(&self, bytes: &[u8]) -> Result<FrameOutcome> {
        let result = self.dispatch(bytes);
        self.stats.record(&result);
        match &result {
            Ok(FrameOutcome::Updated { serial, reading }) => {
                tracing::debug!("Updated {}: {:?}", serial, reading);
            }
            Ok(FrameOutcome::NoData { serial }) => {
                tracing::debug!("No tariff data yet from {}", serial);
            }
            Ok(FrameOutcome::Ignored { serial, command }) => {
                tracing::debug!("No decoder for {} from {}", command, serial);
            }
            Err(e @ MercuryError::ChecksumMismatch { .. }) => {
                tracing::info!("Dropping frame {:02X?}: {}", bytes, e);
            }
            Err(e) => {
                tracing::warn!("Dropping frame {:02X?}: {}", bytes, e);
            }
        }
        result
    }

    fn dispatch(&self, bytes: &[u8]) -> Result<FrameOutcome> {
        let response = frame::parse(bytes)?;
        let record = self
            .store
            .get(&response.address)
            .ok_or(MercuryError::UnknownDevice(response.address))?;
        let serial = record.serial.clone();

        match decode_payload(response.command, &response.payload)? {
            Some(reading) => {
                record.apply(&reading);
                Ok(FrameOutcome::Updated { serial, reading })
            }
            None if matches!(response.command, CommandId::Unknown(_)) => {
                Ok(FrameOutcome::Ignored {
                    serial,
                    command: response.command,
                })
            }
            None => Ok(FrameOutcome::NoData { serial }),
        }
    }

    /// Handle a raw bus message. `Ok(None)` if it carried no frame.
    pub fn handle_message(&self, payload: &str) -> Result<Option<FrameOutcome>> {
        let bytes = match bus::decode_action(payload) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Can't parse bus message '{}': {}", payload, e);
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.handle_frame(&bytes).map(Some)
    }
}
