use crate::address::{DeviceAddress, SerialNumber};
use crate::reading::{Metric, Reading, StatusReading, TariffReading, Zone};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TariffSlots {
    pub centi_kwh: [Option<u64>; Zone::COUNT],
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSlots {
    pub deci_volts: Option<u64>,
    pub centi_amps: Option<u64>,
    pub watts: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Copy of a record's readings at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tariff: TariffSlots,
    pub status: StatusSlots,
}

impl Snapshot {
    /// Value of `metric` in its display unit (kWh, V, A, W).
    #[must_use]
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Voltage => self.status.deci_volts.map(|v| v as f64 / 10.0),
            Metric::Current => self.status.centi_amps.map(|v| v as f64 / 100.0),
            Metric::Power => self.status.watts.map(|v| v as f64),
            Metric::Energy(zone) => self.tariff.centi_kwh[zone.index()].map(|v| v as f64 / 100.0),
        }
    }
}

/// A decoded reading replaces its whole group under the record lock.
#[derive(Debug)]
pub struct DeviceRecord {
    pub serial: SerialNumber,
    pub address: DeviceAddress,
    pub model: String,
    /// Bus topic the meter's modem listens on.
    pub topic: String,
    slots: Mutex<Snapshot>,
}

impl DeviceRecord {
    #[must_use]
    pub fn new(serial: SerialNumber, address: DeviceAddress, model: &str, topic: &str) -> Self {
        Self {
            serial,
            address,
            model: model.to_string(),
            topic: topic.to_string(),
            slots: Mutex::new(Snapshot::default()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Snapshot> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.slots().clone()
    }

    #[must_use]
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.slots().value(metric)
    }

    pub fn apply(&self, reading: &Reading) {
        match reading {
            Reading::Tariff(tariff) => self.apply_tariff(tariff),
            Reading::Status(status) => self.apply_status(status),
        }
    }

    fn apply_tariff(&self, reading: &TariffReading) {
        let mut slots = self.slots();
        slots.tariff = TariffSlots {
            centi_kwh: reading.centi_kwh.map(Some),
            updated_at: Some(Utc::now()),
        };
    }

    fn apply_status(&self, reading: &StatusReading) {
        let mut slots = self.slots();
        slots.status = StatusSlots {
            deci_volts: Some(reading.deci_volts),
            centi_amps: Some(reading.centi_amps),
            watts: Some(reading.watts),
            updated_at: Some(Utc::now()),
        };
    }

    /// Overwrite a single field with a raw scaled value.
    pub fn update(&self, metric: Metric, raw: u64) {
        let mut slots = self.slots();
        let now = Some(Utc::now());
        match metric {
            Metric::Voltage => {
                slots.status.deci_volts = Some(raw);
                slots.status.updated_at = now;
            }
            Metric::Current => {
                slots.status.centi_amps = Some(raw);
                slots.status.updated_at = now;
            }
            Metric::Power => {
                slots.status.watts = Some(raw);
                slots.status.updated_at = now;
            }
            Metric::Energy(zone) => {
                slots.tariff.centi_kwh[zone.index()] = Some(raw);
                slots.tariff.updated_at = now;
            }
        }
    }
}

/// Address-keyed table of device records, shared between the decode path and
/// any number of readers.
#[derive(Debug, Default)]
pub struct ReadingStore {
    records: RwLock<HashMap<DeviceAddress, Arc<DeviceRecord>>>,
}

impl ReadingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless its address is taken. Returns the record that holds
    /// the address afterwards and whether it was inserted.
    pub fn insert(&self, record: DeviceRecord) -> (Arc<DeviceRecord>, bool) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = records.get(&record.address) {
            return (existing.clone(), false);
        }
        let record = Arc::new(record);
        records.insert(record.address, record.clone());
        (record, true)
    }

    #[must_use]
    pub fn get(&self, address: &DeviceAddress) -> Option<Arc<DeviceRecord>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }

    /// Store a decoded reading. Returns `false` if the address is not registered.
    pub fn apply(&self, address: &DeviceAddress, reading: &Reading) -> bool {
        match self.get(address) {
            Some(record) => {
                record.apply(reading);
                true
            }
            None => false,
        }
    }

    /// Overwrite one field of a registered device.
    pub fn update(&self, address: &DeviceAddress, metric: Metric, raw: u64) -> bool {
        match self.get(address) {
            Some(record) => {
                record.update(metric, raw);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<Arc<DeviceRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| a.serial.cmp(&b.serial));
        records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
