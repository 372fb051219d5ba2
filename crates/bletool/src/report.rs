//! Advertising report decoding
//!
//! An LE advertising report frame, as read from a socket filtered to LE meta
//! events, is laid out as:
//!
//! ```text
//! offset  size  field
//!      0     1  packet type (0x04)
//!      1     2  event header: event code (0x3E), parameter length
//!      3     1  meta subevent (0x02)
//!      4     1  number of reports
//!      5     9  report header: event type, address type, address, data length
//!     14    31  advertising data
//!     45     1  RSSI (not decoded)
//! ```

use crate::error::HciError;
use crate::hci::constants::*;
use std::fmt;

/// Offset of the advertising data within a report frame
pub const ADV_PAYLOAD_OFFSET: usize = 1 + HCI_EVENT_HDR_SIZE + 1 + 1 + LE_ADV_INFO_HDR_SIZE;

/// The fixed-length advertising data carried by one report
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvertisingPayload([u8; LE_ADV_DATA_LEN]);

impl AdvertisingPayload {
    pub fn as_bytes(&self) -> &[u8; LE_ADV_DATA_LEN] {
        &self.0
    }
}

impl From<[u8; LE_ADV_DATA_LEN]> for AdvertisingPayload {
    fn from(bytes: [u8; LE_ADV_DATA_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AdvertisingPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AdvertisingPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdvertisingPayload(")?;
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        write!(f, ")")
    }
}

/// Extract the advertising data from a report frame
///
/// Only the frame length is checked; the length, address and RSSI fields are
/// not interpreted and anything after the payload is ignored.
pub fn decode_advertising_payload(frame: &[u8]) -> Result<AdvertisingPayload, HciError> {
    let malformed = || HciError::MalformedFrame {
        needed: ADV_PAYLOAD_OFFSET + LE_ADV_DATA_LEN,
        actual: frame.len(),
    };

    let end = ADV_PAYLOAD_OFFSET.checked_add(LE_ADV_DATA_LEN).ok_or_else(malformed)?;
    let bytes = frame.get(ADV_PAYLOAD_OFFSET..end).ok_or_else(malformed)?;

    let mut payload = [0u8; LE_ADV_DATA_LEN];
    payload.copy_from_slice(bytes);
    Ok(AdvertisingPayload(payload))
}

/// Whether `frame` is an LE meta event carrying advertising reports
pub fn is_advertising_report(frame: &[u8]) -> bool {
    matches!(
        frame,
        [HCI_EVENT_PKT, EVT_LE_META_EVENT, _, EVT_LE_ADVERTISING_REPORT, ..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{advertising_report_frame, numbered_payload};

    #[test]
    fn test_payload_offset() {
        assert_eq!(ADV_PAYLOAD_OFFSET, 14);
    }

    #[test]
    fn test_decode_known_payload() {
        let data = numbered_payload(0xA0);
        let frame = advertising_report_frame(&data, -60);

        let payload = decode_advertising_payload(&frame).unwrap();
        assert_eq!(payload.as_bytes(), &data);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let data = numbered_payload(1);
        let mut frame = advertising_report_frame(&data, -42);
        frame.extend_from_slice(&[0xEE; 20]);

        let payload = decode_advertising_payload(&frame).unwrap();
        assert_eq!(payload.as_bytes(), &data);
    }

    #[test]
    fn test_short_report_reads_following_bytes() {
        // Shorter advertising data still yields 31 bytes: the RSSI and whatever
        // follows are part of the fixed window
        let mut frame = advertising_report_frame(&[0x02, 0x01, 0x06], -50);
        frame.resize(ADV_PAYLOAD_OFFSET + LE_ADV_DATA_LEN, 0);

        let payload = decode_advertising_payload(&frame).unwrap();
        assert_eq!(&payload.as_bytes()[..3], &[0x02, 0x01, 0x06]);
        assert_eq!(payload.as_bytes()[3], (-50i8) as u8);
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let data = numbered_payload(7);
        let frame = advertising_report_frame(&data, 0);

        for len in [0, 1, ADV_PAYLOAD_OFFSET, ADV_PAYLOAD_OFFSET + LE_ADV_DATA_LEN - 1] {
            let err = decode_advertising_payload(&frame[..len]).unwrap_err();
            assert!(matches!(
                err,
                HciError::MalformedFrame { needed: 45, actual } if actual == len
            ));
        }

        assert!(decode_advertising_payload(&frame[..ADV_PAYLOAD_OFFSET + LE_ADV_DATA_LEN]).is_ok());
    }

    #[test]
    fn test_report_classification() {
        let frame = advertising_report_frame(&numbered_payload(0), -1);
        assert!(is_advertising_report(&frame));

        // LE Connection Complete subevent
        assert!(!is_advertising_report(&[HCI_EVENT_PKT, EVT_LE_META_EVENT, 19, 0x01, 0x00]));
        assert!(!is_advertising_report(&[HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1, 0x0C, 0x20, 0]));
        assert!(!is_advertising_report(&[HCI_EVENT_PKT, EVT_LE_META_EVENT]));
    }

    #[test]
    fn test_debug_format() {
        let payload = AdvertisingPayload::from([0xAB; LE_ADV_DATA_LEN]);
        let text = format!("{:?}", payload);

        assert!(text.starts_with("AdvertisingPayload(ABAB"));
        assert_eq!(text.len(), "AdvertisingPayload()".len() + 62);
    }
}
