use crate::error::{MercuryError, Result};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::str::FromStr;

/// Number of trailing serial digits that make up the wire address.
pub const SERIAL_ADDRESS_DIGITS: usize = 6;

/// Largest value a 3-byte address can carry.
pub const MAX_ADDRESS: u32 = 0x00FF_FFFF;

/// On-wire device identifier, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress([u8; 3]);

impl DeviceAddress {
    pub const LEN: usize = 3;

    #[must_use]
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    pub fn from_u32(value: u32) -> Result<Self> {
        if value > MAX_ADDRESS {
            return Err(MercuryError::SerialOutOfRange(u64::from(value)));
        }
        let mut bytes = [0u8; 3];
        BigEndian::write_u24(&mut bytes, value);
        Ok(Self(bytes))
    }

    /// Read an address from the first three bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 3] = bytes
            .get(..Self::LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(MercuryError::InvalidFrame { len: bytes.len() })?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 3] {
        self.0
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        BigEndian::read_u24(&self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl From<[u8; 3]> for DeviceAddress {
    fn from(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }
}

/// Printed serial number of a meter, digits only (e.g. "04023330").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(String);

impl SerialNumber {
    pub fn new(serial: impl Into<String>) -> Result<Self> {
        let serial = serial.into();
        if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MercuryError::InvalidSerial(serial));
        }
        Ok(Self(serial))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the wire address from the last six digits.
    ///
    /// This is a true binary conversion: "04023330" keeps 23330, which goes on
    /// the wire as `00 5B 22`. Leading digits are dropped, so several serials can
    /// share an address and the reverse mapping must be kept in a table.
    pub fn address(&self) -> Result<DeviceAddress> {
        let tail = &self.0[self.0.len().saturating_sub(SERIAL_ADDRESS_DIGITS)..];
        let value: u64 = tail
            .parse()
            .map_err(|_| MercuryError::InvalidSerial(self.0.clone()))?;
        let value = u32::try_from(value).map_err(|_| MercuryError::SerialOutOfRange(value))?;
        DeviceAddress::from_u32(value)
    }
}

impl FromStr for SerialNumber {
    type Err = MercuryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the wire address for a printed serial number.
pub fn to_address(serial: &str) -> Result<DeviceAddress> {
    SerialNumber::new(serial)?.address()
}
