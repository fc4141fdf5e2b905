use crate::command::CommandId;
use crate::error::{MercuryError, Result};
use crate::packed::decode_packed;
use std::fmt;
use uom::si::electric_current::ampere;
use uom::si::electric_potential::volt;
use uom::si::energy::kilowatt_hour;
use uom::si::f64::{ElectricCurrent, ElectricPotential, Energy, Power};
use uom::si::power::watt;

pub const TARIFF_PAYLOAD_LEN: usize = 16;
pub const STATUS_PAYLOAD_LEN: usize = 7;

const ZONE_WIDTH: usize = TARIFF_PAYLOAD_LEN / Zone::COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    T1,
    T2,
    T3,
    T4,
}

impl Zone {
    pub const COUNT: usize = 4;
    pub const ALL: [Zone; Zone::COUNT] = [Zone::T1, Zone::T2, Zone::T3, Zone::T4];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.index() + 1)
    }
}

/// Energy counters per tariff zone, in hundredths of a kilowatt-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TariffReading {
    pub centi_kwh: [u64; Zone::COUNT],
}

impl TariffReading {
    pub fn decode(payload: &[u8]) -> Result<Option<Self>> {
        check_len(CommandId::TariffEnergy, payload, TARIFF_PAYLOAD_LEN)?;

        let mut centi_kwh = [0u64; Zone::COUNT];
        for (counter, group) in centi_kwh.iter_mut().zip(payload.chunks_exact(ZONE_WIDTH)) {
            *counter = decode_packed(group)?;
        }

        // The meter answers with all zeros before it has data. A brand new meter
        // with nothing consumed looks the same and is dropped too.
        if centi_kwh[0] == 0 && payload.iter().all(|&b| b == 0) {
            return Ok(None);
        }

        Ok(Some(Self { centi_kwh }))
    }

    #[must_use]
    pub fn energy(&self, zone: Zone) -> Energy {
        Energy::new::<kilowatt_hour>(self.centi_kwh[zone.index()] as f64 / 100.0)
    }

    #[must_use]
    pub fn kwh(&self, zone: Zone) -> f64 {
        self.energy(zone).get::<kilowatt_hour>()
    }
}

/// Instantaneous electrical status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReading {
    /// Tenths of a volt.
    pub deci_volts: u64,
    /// Hundredths of an ampere.
    pub centi_amps: u64,
    pub watts: u64,
}

impl StatusReading {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        check_len(CommandId::Status, payload, STATUS_PAYLOAD_LEN)?;

        Ok(Self {
            deci_volts: decode_packed(&payload[0..2])?,
            centi_amps: decode_packed(&payload[2..4])?,
            watts: decode_packed(&payload[4..7])?,
        })
    }

    #[must_use]
    pub fn voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<volt>(self.deci_volts as f64 / 10.0)
    }

    #[must_use]
    pub fn current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<ampere>(self.centi_amps as f64 / 100.0)
    }

    #[must_use]
    pub fn power(&self) -> Power {
        Power::new::<watt>(self.watts as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Tariff(TariffReading),
    Status(StatusReading),
}

/// Decode the payload of a response to `command`.
///
/// `Ok(None)` means there is nothing to store: the command has no decoder, or
/// the meter reported no tariff data yet.
pub fn decode_payload(command: CommandId, payload: &[u8]) -> Result<Option<Reading>> {
    match command {
        CommandId::TariffEnergy => Ok(TariffReading::decode(payload)?.map(Reading::Tariff)),
        CommandId::Status => Ok(Some(Reading::Status(StatusReading::decode(payload)?))),
        CommandId::Unknown(_) => Ok(None),
    }
}

fn check_len(command: CommandId, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() != expected {
        return Err(MercuryError::WrongPayloadLength {
            command,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// A single exported value of a meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Voltage,
    Current,
    Power,
    Energy(Zone),
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Power,
        Metric::Voltage,
        Metric::Current,
        Metric::Energy(Zone::T1),
        Metric::Energy(Zone::T2),
        Metric::Energy(Zone::T3),
        Metric::Energy(Zone::T4),
    ];

    #[must_use]
    pub const fn is_energy(self) -> bool {
        matches!(self, Metric::Energy(_))
    }

    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Metric::Voltage => "V",
            Metric::Current => "A",
            Metric::Power => "W",
            Metric::Energy(_) => "kWh",
        }
    }

    /// Sensor name in the `mercury200 <serial> <metric>` form.
    #[must_use]
    pub fn sensor_name(self, serial: &str) -> String {
        format!("mercury200 {} {}", serial, self)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Voltage => write!(f, "voltage"),
            Metric::Current => write!(f, "current"),
            Metric::Power => write!(f, "power"),
            Metric::Energy(zone) => write!(f, "{}", zone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_example() {
        let reading = StatusReading::decode(&[0x02, 0x30, 0x00, 0x50, 0x00, 0x01, 0x90]).unwrap();
        assert_eq!(reading.deci_volts, 230);
        assert_eq!(reading.centi_amps, 50);
        assert_eq!(reading.watts, 190);
        assert!((reading.voltage().get::<volt>() - 23.0).abs() < 1e-9);
        assert!((reading.current().get::<ampere>() - 0.5).abs() < 1e-9);
        assert!((reading.power().get::<watt>() - 190.0).abs() < 1e-9);
    }

    #[test]
    fn status_wrong_length() {
        match StatusReading::decode(&[0x02, 0x30, 0x00]) {
            Err(MercuryError::WrongPayloadLength {
                command,
                expected,
                actual,
            }) => {
                assert_eq!(command, CommandId::Status);
                assert_eq!(expected, 7);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn status_with_bad_digit_is_dropped_whole() {
        let payload = [0x02, 0x30, 0x00, 0x50, 0x00, 0x0A, 0x90];
        assert!(matches!(
            decode_payload(CommandId::Status, &payload),
            Err(MercuryError::MalformedNumeral { byte: 0x0A })
        ));
    }

    #[test]
    fn tariff_zones_in_order() {
        let payload = [
            0x00, 0x12, 0x34, 0x56, // T1
            0x00, 0x00, 0x01, 0x00, // T2
            0x00, 0x00, 0x00, 0x00, // T3
            0x99, 0x99, 0x99, 0x99, // T4
        ];
        let reading = TariffReading::decode(&payload).unwrap().unwrap();
        assert_eq!(reading.centi_kwh, [123_456, 100, 0, 99_999_999]);
        assert!((reading.kwh(Zone::T1) - 1234.56).abs() < 1e-9);
        assert!((reading.kwh(Zone::T2) - 1.0).abs() < 1e-9);
        assert_eq!(reading.kwh(Zone::T3), 0.0);
        assert!((reading.kwh(Zone::T4) - 999_999.99).abs() < 1e-6);
    }

    #[test]
    fn tariff_all_zero_is_no_data() {
        assert_eq!(TariffReading::decode(&[0; 16]).unwrap(), None);
        assert_eq!(
            decode_payload(CommandId::TariffEnergy, &[0; 16]).unwrap(),
            None
        );
    }

    #[test]
    fn tariff_zero_t1_with_other_zones_is_kept() {
        let mut payload = [0u8; 16];
        payload[7] = 0x42;
        let reading = TariffReading::decode(&payload).unwrap().unwrap();
        assert_eq!(reading.centi_kwh, [0, 42, 0, 0]);
    }

    #[test]
    fn tariff_wrong_length() {
        assert!(matches!(
            TariffReading::decode(&[0x01; 15]),
            Err(MercuryError::WrongPayloadLength {
                expected: 16,
                actual: 15,
                ..
            })
        ));
        assert!(matches!(
            decode_payload(CommandId::TariffEnergy, &[]),
            Err(MercuryError::WrongPayloadLength { actual: 0, .. })
        ));
    }

    #[test]
    fn unknown_command_is_ignored() {
        assert_eq!(decode_payload(CommandId::Unknown(0x28), &[0xFF; 3]).unwrap(), None);
    }

    #[test]
    fn metric_names() {
        assert_eq!(Metric::Power.sensor_name("04023330"), "mercury200 04023330 power");
        assert_eq!(
            Metric::Energy(Zone::T3).sensor_name("04023330"),
            "mercury200 04023330 T3"
        );
        assert_eq!(Metric::Energy(Zone::T1).unit(), "kWh");
        assert_eq!(Metric::Voltage.unit(), "V");
    }
}
