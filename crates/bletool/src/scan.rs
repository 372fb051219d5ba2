//! Bluetooth LE scanning functionality
//!
//! A [`ScanSession`] drives one passive scan from start to teardown:
//!
//! ```text
//! Idle -> ParamsSet -> Enabled -> Receiving -> Disabling -> Idle
//! ```
//!
//! Once scanning is enabled the session saves the channel's filter, narrows it
//! to LE meta events and hands every decoded advertising payload to a
//! callback until the [`CancelToken`] fires. Teardown puts the saved filter
//! back and disables scanning.

use crate::cancel::CancelToken;
use crate::error::HciError;
use crate::hci::channel::{Controller, FilterPolicy, HciChannel};
use crate::hci::constants::*;
use crate::hci::filter::HciFilter;
use crate::hci::{HciCommand, HciEvent, LeAdvertisingReport};
use crate::report::{decode_advertising_payload, is_advertising_report, AdvertisingPayload};
use std::io;
use tracing::{debug, trace, warn};

/// Parameters for LE Set Scan Parameters / Set Scan Enable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    /// Only passive scanning (`LE_SCAN_PASSIVE`) is used
    pub scan_type: u8,
    /// In units of 0.625 ms
    pub interval: u16,
    /// In units of 0.625 ms
    pub window: u16,
    pub own_address_type: u8,
    pub filter_policy: u8,
    pub filter_duplicates: bool,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            scan_type: LE_SCAN_PASSIVE,
            interval: 0x0010, // 10ms
            window: 0x0010,   // 10ms
            own_address_type: LE_PUBLIC_ADDRESS,
            filter_policy: 0x00, // Accept all advertisements
            filter_duplicates: false,
        }
    }
}

impl ScanParameters {
    pub fn parameters_command(&self) -> HciCommand {
        HciCommand::LeSetScanParameters {
            scan_type: self.scan_type,
            scan_interval: self.interval,
            scan_window: self.window,
            own_address_type: self.own_address_type,
            filter_policy: self.filter_policy,
        }
    }

    pub fn enable_command(&self, enable: bool) -> HciCommand {
        HciCommand::LeSetScanEnable {
            enable,
            filter_duplicates: self.filter_duplicates,
        }
    }
}

/// Where a scan session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    ParamsSet,
    Enabled,
    Receiving,
    Disabling,
}

/// What a single read at the receive boundary produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(usize),
    /// The read was interrupted and cancellation was requested
    Interrupted,
    /// The channel has no more data
    Closed,
}

/// Counters for one receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    /// Payloads handed to the callback
    pub reports: usize,
    /// Frames that were not advertising reports
    pub skipped: usize,
    /// Advertising reports too short to hold a full payload
    pub malformed: usize,
}

/// One scan from parameter setup to teardown on a single channel
#[derive(Debug)]
pub struct ScanSession<C: HciChannel> {
    controller: Controller<C>,
    params: ScanParameters,
    state: ScanState,
    saved_filter: Option<HciFilter>,
}

impl<C: HciChannel> ScanSession<C> {
    pub fn new(channel: C, params: ScanParameters, policy: FilterPolicy) -> Self {
        Self::with_controller(Controller::new(channel, policy), params)
    }

    pub fn with_controller(controller: Controller<C>, params: ScanParameters) -> Self {
        Self {
            controller,
            params,
            state: ScanState::Idle,
            saved_filter: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The filter captured before the scan filter was installed
    pub fn saved_filter(&self) -> Option<HciFilter> {
        self.saved_filter
    }

    pub fn channel(&self) -> &C {
        self.controller.channel()
    }

    /// Run the whole session: start, receive until cancelled, tear down
    ///
    /// Teardown is attempted whatever happened before it. The first error
    /// wins; teardown errors after an earlier failure are only logged.
    pub fn run<F>(&mut self, cancel: &CancelToken, on_payload: F) -> Result<ScanSummary, HciError>
    where
        F: FnMut(&AdvertisingPayload),
    {
        if let Err(e) = self.start() {
            if let Err(cleanup) = self.stop() {
                warn!(error = %cleanup, "scan teardown after failed setup also failed");
            }
            return Err(e);
        }

        match self.receive(cancel, on_payload) {
            Ok(summary) => {
                self.stop()?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(cleanup) = self.stop() {
                    warn!(error = %cleanup, "scan teardown after receive failure also failed");
                }
                Err(e)
            }
        }
    }

    /// Set parameters, enable scanning and install the LE meta event filter
    pub fn start(&mut self) -> Result<(), HciError> {
        // Set scan parameters (passive scanning, 10ms interval, 10ms window by default)
        self.controller.send_command(&self.params.parameters_command())?;
        self.transition(ScanState::ParamsSet);

        self.controller.send_command(&self.params.enable_command(true))?;
        self.transition(ScanState::Enabled);

        let saved = self.controller.current_filter()?;
        self.saved_filter = Some(saved);
        self.controller.install_filter(&HciFilter::le_meta_events())?;
        debug!(?saved, "installed LE meta event filter");

        Ok(())
    }

    /// Decode advertising reports until `cancel` fires or the channel runs dry
    pub fn receive<F>(&mut self, cancel: &CancelToken, mut on_payload: F) -> Result<ScanSummary, HciError>
    where
        F: FnMut(&AdvertisingPayload),
    {
        self.transition(ScanState::Receiving);

        let mut summary = ScanSummary::default();
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        loop {
            let len = match self.read_boundary(cancel, &mut buf)? {
                ReadOutcome::Frame(len) => len,
                ReadOutcome::Interrupted | ReadOutcome::Closed => break,
            };
            let frame = &buf[..len];

            if !is_advertising_report(frame) {
                trace!(len, "skipping frame that is not an advertising report");
                summary.skipped += 1;
                continue;
            }

            let payload = match decode_advertising_payload(frame) {
                Ok(payload) => payload,
                Err(e) => {
                    debug!(error = %e, "skipping short advertising report");
                    summary.malformed += 1;
                    continue;
                }
            };

            if let Some(report) = HciEvent::from_frame(frame)
                .as_ref()
                .and_then(LeAdvertisingReport::parse_from_meta_event)
            {
                trace!(address = %report.address_string(), rssi = report.rssi, "advertising report");
            }

            on_payload(&payload);
            summary.reports += 1;
        }

        debug!(?summary, "receive loop finished");
        Ok(summary)
    }

    /// Restore the saved filter and disable scanning
    ///
    /// Scanning is disabled even if the filter cannot be restored.
    pub fn stop(&mut self) -> Result<(), HciError> {
        self.transition(ScanState::Disabling);

        let restored = match self.saved_filter {
            Some(saved) => self.controller.install_filter(&saved),
            None => Ok(()),
        };
        if let Err(e) = &restored {
            warn!(error = %e, "could not restore the saved HCI filter");
        }

        let disabled = self.controller.send_command(&self.params.enable_command(false));
        self.transition(ScanState::Idle);

        disabled.and(restored)
    }

    fn read_boundary(&mut self, cancel: &CancelToken, buf: &mut [u8]) -> Result<ReadOutcome, HciError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(ReadOutcome::Interrupted);
            }

            match self.controller.channel_mut().read_frame(buf) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(len) => return Ok(ReadOutcome::Frame(len)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted && cancel.is_cancelled() => {
                    return Ok(ReadOutcome::Interrupted)
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                    continue
                }
                Err(e) => return Err(HciError::ReceiveFailed(e)),
            }
        }
    }

    fn transition(&mut self, next: ScanState) {
        trace!(from = ?self.state, to = ?next, "scan state");
        self.state = next;
    }
}
