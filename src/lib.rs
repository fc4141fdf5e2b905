pub mod address;
pub mod bus;
pub mod checksum;
pub mod command;
pub mod error;
pub mod fleet;
pub mod frame;
pub mod packed;
pub mod reading;
pub mod store;

pub use address::{DeviceAddress, SerialNumber, to_address};
pub use command::{Command, CommandId};
pub use error::{MercuryError, Result};
pub use fleet::{DeviceConfig, FrameCounts, FrameOutcome, MeterFleet, OutboundRequest};
pub use frame::{RequestFrame, ResponseFrame, build_request, parse};
pub use packed::{decode_packed, encode_packed};
pub use reading::{Metric, Reading, StatusReading, TariffReading, Zone, decode_payload};
pub use store::{DeviceRecord, ReadingStore, Snapshot};
