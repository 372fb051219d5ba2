//! Bluetooth LE advertising
//!
//! An [`AdvertiseSession`] configures the advertising parameters, loads the
//! advertising data, switches advertising on for a fixed dwell time and then
//! switches it off again. Any failed command aborts the rest of the sequence.

use crate::adv_data::AdvertisingData;
use crate::error::HciError;
use crate::hci::channel::{Controller, FilterPolicy, HciChannel};
use crate::hci::constants::*;
use crate::hci::HciCommand;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// How long advertising stays enabled
pub const DEFAULT_DWELL: Duration = Duration::from_secs(1);

/// Parameters for LE Set Advertising Parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParameters {
    /// In units of 0.625 ms
    pub min_interval: u16,
    /// In units of 0.625 ms
    pub max_interval: u16,
    pub advertising_type: u8,
    pub own_address_type: u8,
    pub peer_address_type: u8,
    pub peer_address: [u8; 6],
    pub channel_map: u8,
    pub filter_policy: u8,
}

impl Default for AdvertisingParameters {
    fn default() -> Self {
        Self {
            min_interval: 32, // 20ms
            max_interval: 64, // 40ms
            advertising_type: LE_ADV_IND,
            own_address_type: LE_PUBLIC_ADDRESS,
            peer_address_type: LE_PUBLIC_ADDRESS,
            peer_address: [0; 6], // Not used for undirected advertising
            channel_map: LE_ADV_CHANNEL_ALL,
            filter_policy: 0x00, // Allow all scans and connections
        }
    }
}

impl AdvertisingParameters {
    pub fn with_intervals(min_interval: u16, max_interval: u16) -> Self {
        Self {
            min_interval,
            max_interval,
            ..Self::default()
        }
    }

    pub fn to_command(&self) -> HciCommand {
        HciCommand::LeSetAdvertisingParameters {
            min_interval: self.min_interval,
            max_interval: self.max_interval,
            advertising_type: self.advertising_type,
            own_address_type: self.own_address_type,
            peer_address_type: self.peer_address_type,
            peer_address: self.peer_address,
            channel_map: self.channel_map,
            filter_policy: self.filter_policy,
        }
    }
}

/// The transmit sequence on one held channel
#[derive(Debug)]
pub struct AdvertiseSession<C: HciChannel> {
    controller: Controller<C>,
    params: AdvertisingParameters,
    dwell: Duration,
}

impl<C: HciChannel> AdvertiseSession<C> {
    pub fn new(channel: C, params: AdvertisingParameters, policy: FilterPolicy) -> Self {
        Self {
            controller: Controller::new(channel, policy),
            params,
            dwell: DEFAULT_DWELL,
        }
    }

    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    pub fn channel(&self) -> &C {
        self.controller.channel()
    }

    /// Configure, load `data`, advertise for the dwell time, then stop
    pub fn run(&mut self, data: &AdvertisingData) -> Result<(), HciError> {
        self.controller.send_command(&self.params.to_command())?;
        debug!(
            min_interval = self.params.min_interval,
            max_interval = self.params.max_interval,
            "set advertising parameters"
        );

        self.controller.send_command(&data.to_command())?;
        debug!("set advertising data");

        self.controller
            .send_command(&HciCommand::LeSetAdvertisingEnable { enable: true })?;
        info!(dwell_ms = self.dwell.as_millis() as u64, "advertising");

        thread::sleep(self.dwell);

        self.controller
            .send_command(&HciCommand::LeSetAdvertisingEnable { enable: false })?;
        info!("advertising stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adv_data::ADV_PREAMBLE;
    use crate::hci::filter::HciFilter;
    use crate::testing::MockChannel;

    fn session(channel: MockChannel) -> AdvertiseSession<MockChannel> {
        AdvertiseSession::new(channel, AdvertisingParameters::default(), FilterPolicy::PerCommand)
            .with_dwell(Duration::ZERO)
    }

    #[test]
    fn test_default_parameters_layout() {
        let packet = AdvertisingParameters::default().to_command().to_packet();

        // LE Set Advertising Parameters (0x2006), 15 parameter bytes
        assert_eq!(&packet[..4], &[HCI_COMMAND_PKT, 0x06, 0x20, 15]);
        assert_eq!(
            &packet[4..],
            &[0x20, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0x07, 0x00]
        );
    }

    #[test]
    fn test_advertise_sequence() {
        let data = AdvertisingData::new(&[0x01, 0x02]).unwrap();
        let mut session = session(MockChannel::new());

        session.run(&data).unwrap();

        let mut expected_data = ADV_PREAMBLE.to_vec();
        expected_data.extend_from_slice(&[0x01, 0x02]);
        expected_data.resize(32, 0);

        let sent = session.channel().sent_packets();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0], AdvertisingParameters::with_intervals(32, 64).to_command().to_packet());
        assert_eq!(&sent[1][..4], &[HCI_COMMAND_PKT, 0x08, 0x20, 32]);
        assert_eq!(&sent[1][4..], expected_data.as_slice());
        assert_eq!(sent[2], vec![HCI_COMMAND_PKT, 0x0A, 0x20, 1, 0x01]);
        assert_eq!(sent[3], vec![HCI_COMMAND_PKT, 0x0A, 0x20, 1, 0x00]);
    }

    #[test]
    fn test_broad_filter_around_every_command() {
        let data = AdvertisingData::new(&[]).unwrap();
        let mut session = session(MockChannel::new());

        session.run(&data).unwrap();

        let history = session.channel().filter_history();
        assert_eq!(history.len(), 8);
        for pair in history.chunks(2) {
            assert_eq!(pair, &[HciFilter::all_events(), HciFilter::empty()]);
        }
    }

    #[test]
    fn test_dwell_is_observed() {
        let data = AdvertisingData::new(&[]).unwrap();
        let mut session = session(MockChannel::new()).with_dwell(Duration::from_millis(20));

        let started = std::time::Instant::now();
        session.run(&data).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_failure_aborts_remaining_steps() {
        let data = AdvertisingData::new(&[0xAA]).unwrap();
        // The data command (second packet) fails to send
        let mut session = session(MockChannel::new().fail_send_at(1));

        let err = session.run(&data).unwrap_err();
        assert!(matches!(err, HciError::TransmitFailed(_)));
        assert_eq!(session.channel().sent_packets().len(), 1);
    }
}
