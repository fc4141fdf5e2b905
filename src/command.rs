use crate::error::{MercuryError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CommandId {
    /// Voltage, current and active power.
    Status,
    /// Energy counters for tariff zones T1..T4.
    TariffEnergy,
    /// Any other command byte. Passed through, never decoded.
    Unknown(u8),
}

impl CommandId {
    pub const STATUS: u8 = 0x63;
    pub const TARIFF_ENERGY: u8 = 0x27;

    #[must_use]
    pub const fn from_u8(code: u8) -> CommandId {
        match code {
            Self::STATUS => CommandId::Status,
            Self::TARIFF_ENERGY => CommandId::TariffEnergy,
            other => CommandId::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            CommandId::Status => Self::STATUS,
            CommandId::TariffEnergy => Self::TARIFF_ENERGY,
            CommandId::Unknown(code) => code,
        }
    }

    /// Payload length of a well-formed response, for the commands we decode.
    #[must_use]
    pub const fn response_len(self) -> Option<usize> {
        match self {
            CommandId::Status => Some(7),
            CommandId::TariffEnergy => Some(16),
            CommandId::Unknown(_) => None,
        }
    }
}

impl From<u8> for CommandId {
    fn from(code: u8) -> Self {
        CommandId::from_u8(code)
    }
}

impl From<CommandId> for u8 {
    fn from(command: CommandId) -> Self {
        command.as_u8()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandId::Status => write!(f, "status (63h)"),
            CommandId::TariffEnergy => write!(f, "tariff energy (27h)"),
            CommandId::Unknown(code) => write!(f, "unknown ({:02X}h)", code),
        }
    }
}

/// Named request a caller may ask to send.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Command {
    GetStatus,
    GetEnergy,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::GetStatus, Command::GetEnergy];

    #[must_use]
    pub const fn id(self) -> CommandId {
        match self {
            Command::GetStatus => CommandId::Status,
            Command::GetEnergy => CommandId::TariffEnergy,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Command::GetStatus => "get_status",
            Command::GetEnergy => "get_energy",
        }
    }
}

impl FromStr for Command {
    type Err = MercuryError;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| MercuryError::UnsupportedCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
