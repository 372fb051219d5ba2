//! HCI socket event filters
//!
//! A raw HCI socket only delivers the packets its filter lets through. Exactly
//! one filter is active per socket; installing another replaces it.

use crate::hci::constants::*;
use bitflags::bitflags;

bitflags! {
    /// Packet types a filter lets through, one bit per HCI packet type
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PacketTypes: u32 {
        const COMMAND = 1 << HCI_COMMAND_PKT;
        const ACL = 1 << HCI_ACL_PKT;
        const SCO = 1 << HCI_SCO_PKT;
        const EVENT = 1 << HCI_EVENT_PKT;
        const ISO = 1 << HCI_ISO_PKT;
        // The kernel folds vendor packets onto bit 0
        const VENDOR = 1;
    }
}

/// Kernel layout of `struct hci_filter`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RawHciFilter {
    pub type_mask: u32,
    pub event_mask: [u32; 2],
    pub opcode: u16,
}

/// Selector for the packets and events a channel delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HciFilter {
    packet_types: PacketTypes,
    event_mask: [u32; 2],
    opcode: u16,
}

impl Default for HciFilter {
    fn default() -> Self {
        Self::empty()
    }
}

impl HciFilter {
    /// A filter that delivers nothing
    pub fn empty() -> Self {
        Self {
            packet_types: PacketTypes::empty(),
            event_mask: [0, 0],
            opcode: 0,
        }
    }

    /// Every event packet, regardless of event code
    pub fn all_events() -> Self {
        Self {
            packet_types: PacketTypes::EVENT,
            event_mask: [u32::MAX, u32::MAX],
            opcode: 0,
        }
    }

    /// Only LE meta events
    ///
    /// The kernel cannot filter on the meta subevent, so advertising reports
    /// share this filter with the other LE subevents.
    pub fn le_meta_events() -> Self {
        Self::empty()
            .with_packet_type(PacketTypes::EVENT)
            .with_event(EVT_LE_META_EVENT)
    }

    pub fn with_packet_type(mut self, packet_type: PacketTypes) -> Self {
        self.packet_types |= packet_type;
        self
    }

    pub fn with_event(mut self, event_code: u8) -> Self {
        let (word, bit) = Self::event_bit(event_code);
        self.event_mask[word] |= bit;
        self
    }

    pub fn packet_types(&self) -> PacketTypes {
        self.packet_types
    }

    pub fn has_event(&self, event_code: u8) -> bool {
        let (word, bit) = Self::event_bit(event_code);
        self.event_mask[word] & bit != 0
    }

    /// Whether a frame (packet type byte first) would be delivered under this filter
    pub fn accepts(&self, frame: &[u8]) -> bool {
        let Some(&packet_type) = frame.first() else {
            return false;
        };
        let type_bit = if packet_type == HCI_VENDOR_PKT {
            PacketTypes::VENDOR
        } else if packet_type < 32 {
            PacketTypes::from_bits_retain(1 << packet_type)
        } else {
            return false;
        };
        if !self.packet_types.intersects(type_bit) {
            return false;
        }
        if packet_type != HCI_EVENT_PKT {
            return true;
        }
        match frame.get(1) {
            Some(&event_code) => self.has_event(event_code),
            None => false,
        }
    }

    fn event_bit(event_code: u8) -> (usize, u32) {
        // Event codes above 63 are not representable; the kernel masks them the same way
        let code = (event_code & 63) as usize;
        (code >> 5, 1 << (code & 31))
    }

    pub(crate) fn to_raw(self) -> RawHciFilter {
        RawHciFilter {
            type_mask: self.packet_types.bits(),
            event_mask: self.event_mask,
            opcode: self.opcode.to_le(),
        }
    }

    pub(crate) fn from_raw(raw: RawHciFilter) -> Self {
        Self {
            packet_types: PacketTypes::from_bits_retain(raw.type_mask),
            event_mask: raw.event_mask,
            opcode: u16::from_le(raw.opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_filter() {
        let filter = HciFilter::all_events();

        assert_eq!(filter.packet_types(), PacketTypes::EVENT);
        assert!(filter.has_event(EVT_CMD_COMPLETE));
        assert!(filter.has_event(EVT_CMD_STATUS));
        assert!(filter.has_event(EVT_LE_META_EVENT));

        assert!(filter.accepts(&[HCI_EVENT_PKT, EVT_CMD_COMPLETE, 0]));
        assert!(filter.accepts(&[HCI_EVENT_PKT, EVT_LE_META_EVENT, 0]));
        assert!(!filter.accepts(&[HCI_ACL_PKT, 0, 0]));
        assert!(!filter.accepts(&[]));
    }

    #[test]
    fn test_le_meta_filter() {
        let filter = HciFilter::le_meta_events();

        assert_eq!(filter.packet_types(), PacketTypes::EVENT);
        assert!(filter.has_event(EVT_LE_META_EVENT));
        assert!(!filter.has_event(EVT_CMD_COMPLETE));
        assert!(!filter.has_event(EVT_CMD_STATUS));

        assert!(filter.accepts(&[HCI_EVENT_PKT, EVT_LE_META_EVENT, 1, EVT_LE_ADVERTISING_REPORT]));
        assert!(!filter.accepts(&[HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1, 0x0C, 0x20, 0]));
        assert!(!filter.accepts(&[HCI_EVENT_PKT]));
    }

    #[test]
    fn test_kernel_layout() {
        let raw = HciFilter::le_meta_events().to_raw();

        // EVT_LE_META_EVENT (0x3E = 62) sits in the second word, bit 30
        assert_eq!(raw.type_mask, 1 << HCI_EVENT_PKT);
        assert_eq!(raw.event_mask, [0, 1 << 30]);
        assert_eq!(raw.opcode, 0);
        assert_eq!(std::mem::size_of::<RawHciFilter>(), 16);

        assert_eq!(HciFilter::from_raw(raw), HciFilter::le_meta_events());
        assert_eq!(HciFilter::from_raw(HciFilter::all_events().to_raw()), HciFilter::all_events());
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = HciFilter::empty();

        assert!(!filter.accepts(&[HCI_EVENT_PKT, EVT_LE_META_EVENT]));
        assert!(!filter.accepts(&[HCI_COMMAND_PKT, 0x0C, 0x20, 0]));
        assert_ne!(filter, HciFilter::all_events());
    }
}
