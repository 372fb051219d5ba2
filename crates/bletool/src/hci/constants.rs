//! HCI protocol constants
//!
//! This module contains constants used in the Bluetooth HCI protocol.

use std::time::Duration;

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_ACL_PKT: u8 = 0x02;
pub const HCI_SCO_PKT: u8 = 0x03;
pub const HCI_EVENT_PKT: u8 = 0x04;
pub const HCI_ISO_PKT: u8 = 0x05;
pub const HCI_VENDOR_PKT: u8 = 0xFF;

// Maximum size of HCI command parameters
pub const HCI_MAX_PARAM_LEN: usize = 255;

// Maximum size of an HCI event frame (packet type + header + parameters)
pub const HCI_MAX_EVENT_SIZE: usize = 260;

// Event header: event code + parameter total length
pub const HCI_EVENT_HDR_SIZE: usize = 2;

// Opcode field widths
pub const OGF_MAX: u8 = 0x3F;
pub const OCF_MAX: u16 = 0x03FF;

// Opcode Group Field values
pub const OGF_LE: u8 = 0x08;

// LE Command OCF values (OGF: 0x08)
pub const OCF_LE_SET_ADVERTISING_PARAMETERS: u16 = 0x0006;
pub const OCF_LE_SET_ADVERTISING_DATA: u16 = 0x0008;
pub const OCF_LE_SET_ADVERTISING_ENABLE: u16 = 0x000A;
pub const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// HCI Events
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// LE advertising info header: event type, address type, address, data length
pub const LE_ADV_INFO_HDR_SIZE: usize = 9;

// Legacy advertising data is at most 31 bytes
pub const LE_ADV_DATA_LEN: usize = 31;

// Scan type
pub const LE_SCAN_PASSIVE: u8 = 0x00;

// Public device address
pub const LE_PUBLIC_ADDRESS: u8 = 0x00;

// Advertising types
pub const LE_ADV_IND: u8 = 0x00;

// All three primary advertising channels (37, 38, 39)
pub const LE_ADV_CHANNEL_ALL: u8 = 0x07;

// Round-trip budget for a command and its Command Complete / Command Status
pub const HCI_COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Builds a 16-bit opcode from its group and command fields
pub const fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & OCF_MAX)
}
