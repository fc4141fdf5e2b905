use crate::error::{MercuryError, Result};
use crc::{CRC_16_MODBUS, Crc};

pub const MODBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

pub const CHECKSUM_LEN: usize = 2;

#[must_use]
pub fn compute(bytes: &[u8]) -> u16 {
    MODBUS_CRC.checksum(bytes)
}

/// Checksum of `bytes` in wire order, low byte first.
#[must_use]
pub fn compute_le_bytes(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    compute(bytes).to_le_bytes()
}

/// Verify a frame body whose last two bytes are the little-endian checksum of the rest.
///
/// The length prefix of a response frame must already be stripped.
pub fn verify(frame: &[u8]) -> Result<bool> {
    match check(frame) {
        Ok(()) => Ok(true),
        Err(MercuryError::ChecksumMismatch { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Like [`verify`], but a mismatch is an error carrying both checksums.
pub fn check(frame: &[u8]) -> Result<()> {
    if frame.len() < CHECKSUM_LEN {
        return Err(MercuryError::InvalidFrame { len: frame.len() });
    }

    let (head, tail) = frame.split_at(frame.len() - CHECKSUM_LEN);
    let expected = compute(head);
    let actual = u16::from_le_bytes([tail[0], tail[1]]);

    if expected != actual {
        return Err(MercuryError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
