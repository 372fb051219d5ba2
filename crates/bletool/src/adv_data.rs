//! Set-Advertising-Data parameter block
//!
//! The block is the HCI length byte followed by 31 bytes of advertising data.
//! Every block this tool emits starts with the same preamble: the length byte
//! (0x1F), a flags structure, the complete list of 16-bit service UUIDs
//! holding 0xFEAA, and the header of a 0xFEAA service data structure that the
//! caller's payload completes. Unused bytes are zero.

use crate::error::HciError;
use crate::hci::constants::LE_ADV_DATA_LEN;
use crate::hci::HciCommand;

/// Length byte, flags, UUID list and service data header
pub const ADV_PREAMBLE: [u8; 13] = [
    0x1F, // Advertising data length
    0x02, 0x01, 0x06, // Flags: LE General Discoverable, BR/EDR not supported
    0x03, 0x03, 0xAA, 0xFE, // Complete list of 16-bit UUIDs: 0xFEAA
    0x17, 0x16, 0xAA, 0xFE, // Service data for 0xFEAA, 23 bytes
    0x80, // Frame type
];

/// Size of the full parameter block: length byte plus advertising data
pub const ADV_DATA_BLOCK_LEN: usize = 1 + LE_ADV_DATA_LEN;

/// Room left for caller payload after the preamble
pub const MAX_ADV_PAYLOAD_LEN: usize = ADV_DATA_BLOCK_LEN - ADV_PREAMBLE.len();

/// A complete, zero-padded Set-Advertising-Data parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingData {
    block: [u8; ADV_DATA_BLOCK_LEN],
}

impl AdvertisingData {
    /// Preamble followed by `payload`, padded with zeros
    ///
    /// Payloads longer than [`MAX_ADV_PAYLOAD_LEN`] are rejected.
    pub fn new(payload: &[u8]) -> Result<Self, HciError> {
        if payload.len() > MAX_ADV_PAYLOAD_LEN {
            return Err(HciError::AdvertisingDataTooLong {
                len: payload.len(),
                max: MAX_ADV_PAYLOAD_LEN,
            });
        }

        let mut block = [0u8; ADV_DATA_BLOCK_LEN];
        block[..ADV_PREAMBLE.len()].copy_from_slice(&ADV_PREAMBLE);
        block[ADV_PREAMBLE.len()..ADV_PREAMBLE.len() + payload.len()].copy_from_slice(payload);
        Ok(Self { block })
    }

    /// The parameter block as sent, length byte first
    pub fn as_bytes(&self) -> &[u8; ADV_DATA_BLOCK_LEN] {
        &self.block
    }

    /// The 31 bytes of advertising data, without the length byte
    pub fn frame(&self) -> &[u8] {
        &self.block[1..]
    }

    pub fn to_command(&self) -> HciCommand {
        HciCommand::LeSetAdvertisingData {
            data: self.block.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_payload_and_padding() {
        let data = AdvertisingData::new(&[0x01, 0x02]).unwrap();
        let bytes = data.as_bytes();

        assert_eq!(&bytes[..13], &ADV_PREAMBLE);
        assert_eq!(&bytes[13..15], &[0x01, 0x02]);
        assert!(bytes[15..].iter().all(|&b| b == 0));
        assert_eq!(data.frame().len(), LE_ADV_DATA_LEN);
    }

    #[test]
    fn test_frame_length_never_changes() {
        for len in 0..=MAX_ADV_PAYLOAD_LEN {
            let payload = vec![0x5A; len];
            let data = AdvertisingData::new(&payload).unwrap();

            assert_eq!(data.as_bytes().len(), ADV_DATA_BLOCK_LEN);
            assert_eq!(data.frame().len(), LE_ADV_DATA_LEN);
            assert_eq!(&data.as_bytes()[13..13 + len], payload.as_slice());
        }
    }

    #[test]
    fn test_overflowing_payload_is_rejected() {
        assert_eq!(MAX_ADV_PAYLOAD_LEN, 19);

        let err = AdvertisingData::new(&[0u8; MAX_ADV_PAYLOAD_LEN + 1]).unwrap_err();
        assert!(matches!(err, HciError::AdvertisingDataTooLong { len: 20, max: 19 }));
    }

    #[test]
    fn test_length_byte_matches_data_length() {
        assert_eq!(ADV_PREAMBLE[0] as usize, LE_ADV_DATA_LEN);

        // The service data length byte covers its type, UUID, frame type and the payload room
        assert_eq!(ADV_PREAMBLE[8] as usize, 1 + 2 + 1 + MAX_ADV_PAYLOAD_LEN);
    }

    #[test]
    fn test_command_parameters() {
        let data = AdvertisingData::new(&[0xCA, 0xFE]).unwrap();
        let packet = data.to_command().to_packet();

        // LE Set Advertising Data (0x2008)
        assert_eq!(&packet[..4], &[0x01, 0x08, 0x20, ADV_DATA_BLOCK_LEN as u8]);
        assert_eq!(&packet[4..], data.as_bytes());
    }
}
