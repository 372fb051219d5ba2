//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides functionality for interacting with HCI interfaces.

pub mod channel;
pub mod constants;
pub mod filter;
pub mod packet;
pub mod socket;


pub use channel::{Controller, FilterPolicy, HciChannel};
pub use filter::{HciFilter, PacketTypes};
pub use packet::{HciCommand, HciEvent, LeAdvertisingReport};
pub use socket::{HciDeviceInfo, HciSocket};
