//! In-memory `HciChannel` used by the unit tests

use crate::cancel::CancelToken;
use crate::hci::channel::HciChannel;
use crate::hci::constants::*;
use crate::hci::filter::HciFilter;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

enum Inbound {
    Frame(Vec<u8>),
    /// The operator interrupt arrives while the read is blocked
    Signal,
    /// A signal unrelated to cancellation interrupts the read
    SpuriousInterrupt,
    Error(io::ErrorKind),
}

/// Scripted channel that records everything the code under test does to it
pub struct MockChannel {
    filter: HciFilter,
    filter_history: Vec<HciFilter>,
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    inbound: VecDeque<Inbound>,
    cancel: Option<CancelToken>,
    auto_ack: bool,
    fail_send_at: Option<usize>,
    fail_set_filter: bool,
    fail_get_filter: bool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::with_filter(HciFilter::empty())
    }

    pub fn with_filter(filter: HciFilter) -> Self {
        Self {
            filter,
            filter_history: Vec::new(),
            sent: Vec::new(),
            responses: VecDeque::new(),
            inbound: VecDeque::new(),
            cancel: None,
            auto_ack: true,
            fail_send_at: None,
            fail_set_filter: false,
            fail_get_filter: false,
        }
    }

    pub fn without_auto_ack(mut self) -> Self {
        self.auto_ack = false;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn fail_send(self) -> Self {
        self.fail_send_at(0)
    }

    /// Fail the send of the `index`th packet (zero based)
    pub fn fail_send_at(mut self, index: usize) -> Self {
        self.fail_send_at = Some(index);
        self
    }

    pub fn fail_set_filter(mut self) -> Self {
        self.fail_set_filter = true;
        self
    }

    pub fn fail_get_filter(mut self) -> Self {
        self.fail_get_filter = true;
        self
    }

    /// Queue a frame for the command completion reader
    pub fn push_response(&mut self, frame: Vec<u8>) {
        self.responses.push_back(frame);
    }

    /// Queue a frame for the blocking reader
    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.inbound.push_back(Inbound::Frame(frame));
    }

    pub fn push_signal(&mut self) {
        self.inbound.push_back(Inbound::Signal);
    }

    pub fn push_spurious_interrupt(&mut self) {
        self.inbound.push_back(Inbound::SpuriousInterrupt);
    }

    pub fn push_error(&mut self, kind: io::ErrorKind) {
        self.inbound.push_back(Inbound::Error(kind));
    }

    pub fn sent_packets(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn filter_history(&self) -> &[HciFilter] {
        &self.filter_history
    }

    fn interrupted() -> io::Error {
        io::Error::from(io::ErrorKind::Interrupted)
    }
}

impl HciChannel for MockChannel {
    fn send_packet(&mut self, packet: &[u8]) -> io::Result<()> {
        if self.fail_send_at == Some(self.sent.len()) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.sent.push(packet.to_vec());

        if self.auto_ack && packet.len() >= 4 && packet[0] == HCI_COMMAND_PKT {
            let opcode = u16::from_le_bytes([packet[1], packet[2]]);
            let ack = command_complete(opcode, 0x00);
            // Dropped like the kernel would if the installed filter hides it
            if self.filter.accepts(&ack) {
                self.responses.push_back(ack);
            }
        }
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inbound.pop_front() {
                Some(Inbound::Frame(frame)) => {
                    if !self.filter.accepts(&frame) {
                        continue;
                    }
                    let len = frame.len().min(buf.len());
                    buf[..len].copy_from_slice(&frame[..len]);
                    return Ok(len);
                }
                Some(Inbound::Signal) | None => {
                    return match &self.cancel {
                        Some(token) => {
                            token.cancel();
                            Err(Self::interrupted())
                        }
                        None => Err(io::Error::new(io::ErrorKind::Other, "script exhausted")),
                    };
                }
                Some(Inbound::SpuriousInterrupt) => return Err(Self::interrupted()),
                Some(Inbound::Error(kind)) => return Err(io::Error::from(kind)),
            }
        }
    }

    fn read_frame_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<Option<usize>> {
        match self.responses.pop_front() {
            Some(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(Some(len))
            }
            None => Ok(None),
        }
    }

    fn filter(&self) -> io::Result<HciFilter> {
        if self.fail_get_filter {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(self.filter)
    }

    fn set_filter(&mut self, filter: &HciFilter) -> io::Result<()> {
        if self.fail_set_filter {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.filter = *filter;
        self.filter_history.push(*filter);
        Ok(())
    }
}

/// Command Complete event frame for `opcode`
pub fn command_complete(opcode: u16, status: u8) -> Vec<u8> {
    let [lo, hi] = opcode.to_le_bytes();
    vec![HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1, lo, hi, status]
}

/// LE Meta Event frame carrying one advertising report with `data`
pub fn advertising_report_frame(data: &[u8], rssi: i8) -> Vec<u8> {
    let address = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

    let mut params = vec![EVT_LE_ADVERTISING_REPORT, 1, 0x00, LE_PUBLIC_ADDRESS];
    params.extend_from_slice(&address);
    params.push(data.len() as u8);
    params.extend_from_slice(data);
    params.push(rssi as u8);

    let mut frame = vec![HCI_EVENT_PKT, EVT_LE_META_EVENT, params.len() as u8];
    frame.extend_from_slice(&params);
    frame
}

/// A recognisable 31-byte payload
pub fn numbered_payload(seed: u8) -> [u8; LE_ADV_DATA_LEN] {
    let mut payload = [0u8; LE_ADV_DATA_LEN];
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = seed.wrapping_add(i as u8);
    }
    payload
}
