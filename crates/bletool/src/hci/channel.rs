//! Command/event exchange over an HCI control channel
//!
//! [`HciChannel`] is the seam between the sequencers and the radio: the real
//! implementation is [`HciSocket`](crate::hci::HciSocket). [`Controller`]
//! sends commands over a channel and waits for the controller to answer them.

use crate::error::HciError;
use crate::hci::constants::*;
use crate::hci::filter::HciFilter;
use crate::hci::packet::{HciCommand, HciEvent};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Raw frame I/O and filter control on one open channel
pub trait HciChannel {
    /// Write one complete packet
    fn send_packet(&mut self, packet: &[u8]) -> io::Result<()>;

    /// Block until one frame arrives; signals surface as `ErrorKind::Interrupted`
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Like `read_frame`, returning `None` once `timeout` elapses
    fn read_frame_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;

    /// The filter currently installed
    fn filter(&self) -> io::Result<HciFilter>;

    /// Replace the installed filter
    fn set_filter(&mut self, filter: &HciFilter) -> io::Result<()>;
}

/// When the broad "all events" filter is installed for command sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPolicy {
    /// Install it before every command and put the previous filter back once
    /// the command has completed
    #[default]
    PerCommand,
    /// Install it once, before the first command, and leave it in place
    PerSession,
}

/// Sends commands over a channel and waits for their completion events
#[derive(Debug)]
pub struct Controller<C: HciChannel> {
    channel: C,
    policy: FilterPolicy,
    timeout: Duration,
    broad_filter_installed: bool,
}

impl<C: HciChannel> Controller<C> {
    pub fn new(channel: C, policy: FilterPolicy) -> Self {
        Self {
            channel,
            policy,
            timeout: HCI_COMMAND_TIMEOUT,
            broad_filter_installed: false,
        }
    }

    /// Override the completion timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Send `command` and wait for its Command Complete or Command Status
    ///
    /// Fails with `CommandTimeout` if nothing answers within the timeout and
    /// with `CommandRejected` if the controller reports a non-zero status.
    pub fn send_command(&mut self, command: &HciCommand) -> Result<(), HciError> {
        let packet = command.encode()?;

        match self.policy {
            FilterPolicy::PerCommand => {
                let previous = self.channel.filter().map_err(HciError::FilterQueryFailed)?;
                self.install_filter(&HciFilter::all_events())?;
                let result = self.transmit(command.opcode(), &packet);
                // A failed restore is reported only if the command itself succeeded
                let restored = self.install_filter(&previous);
                result.and(restored)
            }
            FilterPolicy::PerSession => {
                if !self.broad_filter_installed {
                    self.install_filter(&HciFilter::all_events())?;
                    self.broad_filter_installed = true;
                }
                self.transmit(command.opcode(), &packet)
            }
        }
    }

    /// Replace the channel's filter
    pub fn install_filter(&mut self, filter: &HciFilter) -> Result<(), HciError> {
        trace!(?filter, "installing HCI filter");
        self.channel.set_filter(filter).map_err(HciError::FilterInstallFailed)
    }

    /// Read back the channel's current filter
    pub fn current_filter(&self) -> Result<HciFilter, HciError> {
        self.channel.filter().map_err(HciError::FilterQueryFailed)
    }

    fn transmit(&mut self, opcode: u16, packet: &[u8]) -> Result<(), HciError> {
        debug!(opcode = %format!("0x{:04X}", opcode), len = packet.len() - 4, "sending HCI command");
        self.channel.send_packet(packet).map_err(HciError::TransmitFailed)?;

        self.await_completion(opcode)
    }

    fn await_completion(&mut self, opcode: u16) -> Result<(), HciError> {
        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(HciError::CommandTimeout { opcode });
            }

            let len = match self.channel.read_frame_timeout(&mut buf, remaining) {
                Ok(Some(len)) => len,
                Ok(None) => return Err(HciError::CommandTimeout { opcode }),
                Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                    continue
                }
                Err(e) => return Err(HciError::ReceiveFailed(e)),
            };

            let Some(event) = HciEvent::from_frame(&buf[..len]) else {
                trace!(len, "ignoring non-event frame while awaiting completion");
                continue;
            };

            match event.completion_status(opcode) {
                Some(0) => return Ok(()),
                Some(status) => return Err(HciError::CommandRejected { opcode, status }),
                None => trace!(event_code = event.event_code, "ignoring unrelated event"),
            }
        }
    }
}
