//! HCI packet structures and parsing
//!
//! This module contains structures and methods for handling HCI packets.

use crate::error::HciError;
use crate::hci::constants::*;
use byteorder::{LittleEndian, WriteBytesExt};

/// Commands this tool sends to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HciCommand {
    // LE Commands (OGF: 0x08)
    LeSetScanParameters {
        scan_type: u8,
        scan_interval: u16,
        scan_window: u16,
        own_address_type: u8,
        filter_policy: u8,
    },
    LeSetScanEnable { enable: bool, filter_duplicates: bool },
    LeSetAdvertisingParameters {
        min_interval: u16,
        max_interval: u16,
        advertising_type: u8,
        own_address_type: u8,
        peer_address_type: u8,
        peer_address: [u8; 6],
        channel_map: u8,
        filter_policy: u8,
    },
    /// Advertising data block including its leading length byte
    LeSetAdvertisingData { data: Vec<u8> },
    LeSetAdvertisingEnable { enable: bool },

    /// Arbitrary command with caller-supplied parameters
    Raw { ogf: u8, ocf: u16, params: Vec<u8> },
}

impl HciCommand {
    /// Builds a raw command, checking the opcode field widths and parameter length
    pub fn new(ogf: u8, ocf: u16, params: Vec<u8>) -> Result<Self, HciError> {
        let command = Self::Raw { ogf, ocf, params };
        command.validate()?;
        Ok(command)
    }

    /// Checks that the opcode fields fit 6 and 10 bits and that the
    /// parameters fit the one-byte length field
    pub fn validate(&self) -> Result<(), HciError> {
        let (ogf, ocf) = self.opcode_parts();
        if ogf > OGF_MAX || ocf > OCF_MAX {
            return Err(HciError::InvalidOpcode { ogf, ocf });
        }

        let len = match self {
            Self::LeSetAdvertisingData { data } => data.len(),
            Self::Raw { params, .. } => params.len(),
            _ => return Ok(()),
        };
        if len > HCI_MAX_PARAM_LEN {
            return Err(HciError::InvalidParamLength(len));
        }
        Ok(())
    }

    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::LeSetScanParameters { .. } => (OGF_LE, OCF_LE_SET_SCAN_PARAMETERS),
            Self::LeSetScanEnable { .. } => (OGF_LE, OCF_LE_SET_SCAN_ENABLE),
            Self::LeSetAdvertisingParameters { .. } => (OGF_LE, OCF_LE_SET_ADVERTISING_PARAMETERS),
            Self::LeSetAdvertisingData { .. } => (OGF_LE, OCF_LE_SET_ADVERTISING_DATA),
            Self::LeSetAdvertisingEnable { .. } => (OGF_LE, OCF_LE_SET_ADVERTISING_ENABLE),
            Self::Raw { ogf, ocf, .. } => (*ogf, *ocf),
        }
    }

    /// The combined 16-bit opcode
    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        opcode(ogf, ocf)
    }

    /// Convert the command to its raw parameter bytes
    pub fn parameters(&self) -> Vec<u8> {
        match self {
            Self::LeSetScanParameters {
                scan_type,
                scan_interval,
                scan_window,
                own_address_type,
                filter_policy,
            } => {
                let mut params = Vec::with_capacity(7);
                params.push(*scan_type);
                // Writes into a Vec cannot fail
                let _ = params.write_u16::<LittleEndian>(*scan_interval);
                let _ = params.write_u16::<LittleEndian>(*scan_window);
                params.push(*own_address_type);
                params.push(*filter_policy);
                params
            }

            Self::LeSetScanEnable { enable, filter_duplicates } => {
                vec![*enable as u8, *filter_duplicates as u8]
            }

            Self::LeSetAdvertisingParameters {
                min_interval,
                max_interval,
                advertising_type,
                own_address_type,
                peer_address_type,
                peer_address,
                channel_map,
                filter_policy,
            } => {
                let mut params = Vec::with_capacity(15);
                let _ = params.write_u16::<LittleEndian>(*min_interval);
                let _ = params.write_u16::<LittleEndian>(*max_interval);
                params.push(*advertising_type);
                params.push(*own_address_type);
                params.push(*peer_address_type);
                params.extend_from_slice(peer_address);
                params.push(*channel_map);
                params.push(*filter_policy);
                params
            }

            Self::LeSetAdvertisingData { data } => data.clone(),

            Self::LeSetAdvertisingEnable { enable } => vec![*enable as u8],

            Self::Raw { params, .. } => params.clone(),
        }
    }

    /// Validate the command and convert it to a raw HCI packet
    pub fn encode(&self) -> Result<Vec<u8>, HciError> {
        self.validate()?;
        Ok(self.to_packet())
    }

    /// Convert the command to a raw HCI packet
    ///
    /// No limits are checked; a command built by hand with oversized fields
    /// encodes wrongly. Use [`encode`](Self::encode) before transmitting.
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut packet = Vec::with_capacity(4 + params.len());
        packet.push(HCI_COMMAND_PKT);
        let _ = packet.write_u16::<LittleEndian>(self.opcode());
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }
}

/// HCI Event packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes (without the packet type byte)
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HCI_EVENT_HDR_SIZE {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];
        let end = HCI_EVENT_HDR_SIZE + parameter_total_length as usize;

        let parameters = data.get(HCI_EVENT_HDR_SIZE..end)?.to_vec();

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }

    /// Parse an event from a frame as read from the socket (packet type byte first)
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        match frame.split_first() {
            Some((&HCI_EVENT_PKT, rest)) => Self::parse(rest),
            _ => None,
        }
    }

    /// Returns the status byte if this event completes the command with `opcode`
    ///
    /// Command Complete carries `num_packets, opcode, status, ..`, Command Status
    /// carries `status, num_packets, opcode`.
    pub fn completion_status(&self, opcode: u16) -> Option<u8> {
        let p = &self.parameters;
        match self.event_code {
            EVT_CMD_COMPLETE if p.len() >= 4 => {
                (u16::from_le_bytes([p[1], p[2]]) == opcode).then_some(p[3])
            }
            EVT_CMD_STATUS if p.len() >= 4 => {
                (u16::from_le_bytes([p[2], p[3]]) == opcode).then_some(p[0])
            }
            _ => None,
        }
    }
}

/// LE Advertising Report Event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeAdvertisingReport {
    pub event_type: u8,
    pub address_type: u8,
    pub address: [u8; 6],
    pub data_length: u8,
    pub data: Vec<u8>,
    pub rssi: i8,
}

impl LeAdvertisingReport {
    /// Parse the first LE Advertising Report from an HCI LE Meta Event
    pub fn parse_from_meta_event(event: &HciEvent) -> Option<Self> {
        if event.event_code != EVT_LE_META_EVENT || event.parameters.is_empty() {
            return None;
        }

        let subevent_code = event.parameters[0];
        if subevent_code != EVT_LE_ADVERTISING_REPORT {
            return None;
        }

        // Subevent, report count, then the first report
        if event.parameters.len() < 12 {
            return None;
        }

        let event_type = event.parameters[2];
        let address_type = event.parameters[3];

        let mut address = [0u8; 6];
        address.copy_from_slice(&event.parameters[4..10]);

        let data_length = event.parameters[10];
        let data_end = 11 + data_length as usize;
        let data = event.parameters.get(11..data_end)?.to_vec();
        let rssi = *event.parameters.get(data_end)? as i8;

        Some(LeAdvertisingReport {
            event_type,
            address_type,
            address,
            data_length,
            data,
            rssi,
        })
    }

    /// Address in the usual colon-separated, most-significant-first form
    pub fn address_string(&self) -> String {
        self.address
            .iter()
            .rev()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}
