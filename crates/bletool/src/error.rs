//! Error types for the bletool library
//!
//! This module defines the error types used throughout the library.

use thiserror::Error;

/// Errors that can occur when driving an HCI control channel
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Could not open device {device}: {source}")]
    DeviceOpenFailed {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No Bluetooth adapter available")]
    NoDevice,

    #[error("HCI filter setup failed: {0}")]
    FilterInstallFailed(std::io::Error),

    #[error("Could not get socket options: {0}")]
    FilterQueryFailed(std::io::Error),

    #[error("Send failed: {0}")]
    TransmitFailed(std::io::Error),

    #[error("Failed to receive HCI event: {0}")]
    ReceiveFailed(std::io::Error),

    #[error("Timed out waiting for completion of command 0x{opcode:04X}")]
    CommandTimeout { opcode: u16 },

    #[error("Command 0x{opcode:04X} failed with status 0x{status:02X}")]
    CommandRejected { opcode: u16, status: u8 },

    #[error("Malformed frame: need {needed} bytes, got {actual}")]
    MalformedFrame { needed: usize, actual: usize },

    #[error("Invalid parameter length: {0}")]
    InvalidParamLength(usize),

    #[error("Invalid opcode: ogf 0x{ogf:02X}, ocf 0x{ocf:04X}")]
    InvalidOpcode { ogf: u8, ocf: u16 },

    #[error("Advertising payload of {len} bytes exceeds the {max} bytes available")]
    AdvertisingDataTooLong { len: usize, max: usize },
}

impl HciError {
    /// Whether the error came from the channel itself rather than from the controller
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceOpenFailed { .. }
                | Self::NoDevice
                | Self::FilterInstallFailed(_)
                | Self::FilterQueryFailed(_)
                | Self::TransmitFailed(_)
                | Self::ReceiveFailed(_)
        )
    }
}
