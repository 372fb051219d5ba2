//! bletool - a minimal control plane for a Bluetooth LE radio
//!
//! This library drives a local controller over a raw HCI socket on Linux. It
//! either runs a passive scan and decodes the advertising payload of every
//! report it receives, or emits one advertising payload for a fixed time.

pub mod adv_data;
pub mod advertise;
pub mod cancel;
pub mod error;
pub mod hci;
pub mod hexdump;
pub mod report;
pub mod scan;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types for convenience
pub use adv_data::AdvertisingData;
pub use advertise::{AdvertiseSession, AdvertisingParameters};
pub use cancel::CancelToken;
pub use error::HciError;
pub use hci::{Controller, FilterPolicy, HciChannel, HciCommand, HciEvent, HciFilter, HciSocket};
pub use report::{decode_advertising_payload, AdvertisingPayload};
pub use scan::{ScanParameters, ScanSession, ScanState, ScanSummary};
