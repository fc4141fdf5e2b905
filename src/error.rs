use crate::address::DeviceAddress;
use crate::command::CommandId;

#[derive(Debug, thiserror::Error)]
pub enum MercuryError {
    #[error("Invalid frame: {len} bytes is too short")]
    InvalidFrame { len: usize },
    #[error("Checksum mismatch: expected {expected:04X}, got {actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },
    #[error("Wrong payload length for {command}: expected {expected} bytes, got {actual}")]
    WrongPayloadLength {
        command: CommandId,
        expected: usize,
        actual: usize,
    },
    #[error("Malformed packed-decimal byte {byte:02X}")]
    MalformedNumeral { byte: u8 },
    #[error("Packed-decimal numeral of {len} bytes is too wide")]
    NumeralTooWide { len: usize },
    #[error("Invalid serial number '{0}'")]
    InvalidSerial(String),
    #[error("Serial number {0} does not fit in a 3-byte address")]
    SerialOutOfRange(u64),
    #[error("Frame from unknown device {0}")]
    UnknownDevice(DeviceAddress),
    #[error("Unsupported command '{0}'")]
    UnsupportedCommand(String),
    #[error("Unsupported device model '{0}'")]
    UnsupportedDevice(String),
    #[error("Device '{0}' is already registered")]
    DuplicateDevice(String),
    #[error("Device '{0}' is not registered")]
    UnregisteredDevice(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MercuryError {
    /// Errors raised while handling an inbound frame. The frame is dropped and the
    /// caller keeps listening.
    pub const fn is_frame_level(&self) -> bool {
        matches!(
            self,
            MercuryError::InvalidFrame { .. }
                | MercuryError::ChecksumMismatch { .. }
                | MercuryError::WrongPayloadLength { .. }
                | MercuryError::MalformedNumeral { .. }
                | MercuryError::NumeralTooWide { .. }
                | MercuryError::UnknownDevice(_)
                | MercuryError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MercuryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_not_configuration_errors() {
        assert!(MercuryError::ChecksumMismatch { expected: 1, actual: 2 }.is_frame_level());
        assert!(MercuryError::UnknownDevice(DeviceAddress::new([0, 0x5B, 0x22])).is_frame_level());
        assert!(!MercuryError::InvalidSerial("abc".into()).is_frame_level());
        assert!(!MercuryError::SerialOutOfRange(99_999_999).is_frame_level());
        assert!(!MercuryError::UnsupportedCommand("reboot".into()).is_frame_level());
    }

    #[test]
    fn messages_show_hex() {
        let err = MercuryError::ChecksumMismatch {
            expected: 0xBEEF,
            actual: 0x00AB,
        };
        assert_eq!(err.to_string(), "Checksum mismatch: expected BEEF, got 00AB");
        let err = MercuryError::MalformedNumeral { byte: 0xAB };
        assert_eq!(err.to_string(), "Malformed packed-decimal byte AB");
    }
}
