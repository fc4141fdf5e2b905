//! Request and response framing.
//!
//! Request:  `[len] [00] [addr x3] [cmd] [crc lo] [crc hi]`
//! Response: `[len] [addr x3] [cmd] [payload ...] [crc lo] [crc hi]`
//!
//! The checksum covers everything between the length byte and the checksum.
//! The length byte is written on the way out but never trusted on the way in.

use crate::address::DeviceAddress;
use crate::checksum::{self, CHECKSUM_LEN};
use crate::command::CommandId;
use crate::error::{MercuryError, Result};

/// High byte of the 4-byte meter address. Always zero for this meter family.
pub const ADDRESS_PREFIX: u8 = 0x00;

pub const REQUEST_FRAME_LEN: usize = 8;

/// Length prefix + address + command + checksum, empty payload.
pub const MIN_RESPONSE_FRAME_LEN: usize = 1 + DeviceAddress::LEN + 1 + CHECKSUM_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame {
    pub address: DeviceAddress,
    pub command: CommandId,
}

impl RequestFrame {
    #[must_use]
    pub const fn new(address: DeviceAddress, command: CommandId) -> Self {
        Self { address, command }
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let [a0, a1, a2] = self.address.bytes();
        let body = [ADDRESS_PREFIX, a0, a1, a2, self.command.as_u8()];

        let mut frame = Vec::with_capacity(REQUEST_FRAME_LEN);
        frame.push((body.len() + CHECKSUM_LEN) as u8);
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&checksum::compute_le_bytes(&body));
        frame
    }

    /// Inverse of [`RequestFrame::serialize`]. Used to inspect captured requests.
    pub fn deserialize(frame: &[u8]) -> Result<Self> {
        if frame.len() != REQUEST_FRAME_LEN || frame[1] != ADDRESS_PREFIX {
            return Err(MercuryError::InvalidFrame { len: frame.len() });
        }
        checksum::check(&frame[1..])?;

        Ok(Self {
            address: DeviceAddress::from_slice(&frame[2..5])?,
            command: CommandId::from_u8(frame[5]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub address: DeviceAddress,
    pub command: CommandId,
    pub payload: Vec<u8>,
}

impl ResponseFrame {
    #[must_use]
    pub const fn new(address: DeviceAddress, command: CommandId, payload: Vec<u8>) -> Self {
        Self {
            address,
            command,
            payload,
        }
    }

    /// Encode the frame the way a meter sends it.
    ///
    /// The length prefix saturates at 255 for payloads longer than 250 bytes.
    /// `deserialize` ignores the prefix, so such frames still parse.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(DeviceAddress::LEN + 1 + self.payload.len());
        body.extend_from_slice(&self.address.bytes());
        body.push(self.command.as_u8());
        body.extend_from_slice(&self.payload);
        let crc = checksum::compute_le_bytes(&body);

        let mut frame = Vec::with_capacity(1 + body.len() + CHECKSUM_LEN);
        frame.push(u8::try_from(body.len() + CHECKSUM_LEN).unwrap_or(u8::MAX));
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&crc);
        frame
    }

    pub fn deserialize(frame: &[u8]) -> Result<Self> {
        if frame.len() < MIN_RESPONSE_FRAME_LEN {
            return Err(MercuryError::InvalidFrame { len: frame.len() });
        }

        let body = &frame[1..];
        checksum::check(body)?;

        let (data, _crc) = body.split_at(body.len() - CHECKSUM_LEN);
        let address = DeviceAddress::from_slice(data)?;
        let command = CommandId::from_u8(data[DeviceAddress::LEN]);
        let payload = data[DeviceAddress::LEN + 1..].to_vec();

        Ok(Self {
            address,
            command,
            payload,
        })
    }
}

/// Build the 8-byte request for `command` addressed to `address`.
#[must_use]
pub fn build_request(address: DeviceAddress, command: CommandId) -> Vec<u8> {
    RequestFrame::new(address, command).serialize()
}

/// Validate and split an inbound response frame.
pub fn parse(frame: &[u8]) -> Result<ResponseFrame> {
    ResponseFrame::deserialize(frame)
}
