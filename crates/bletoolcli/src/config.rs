//! Run configuration for bletool
//!
//! Folds the parsed command line into the typed values the library sequencers
//! take. Hex input is converted here, before any radio operation.

use crate::cli::{Cli, OddHexPolicy};
use anyhow::{bail, Context, Result};
use bletool::{AdvertisingData, AdvertisingParameters, FilterPolicy, ScanParameters};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Receive,
    Send(AdvertisingData),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub device: String,
    pub mode: Mode,
    pub filter_policy: FilterPolicy,
    pub scan: ScanParameters,
    pub advertising: AdvertisingParameters,
    pub dwell: Duration,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mode = match &cli.send {
            Some(text) => {
                let payload = parse_hex_payload(text, cli.odd_hex)?;
                let data = AdvertisingData::new(&payload).context("Invalid advertising payload")?;
                Mode::Send(data)
            }
            None => Mode::Receive,
        };

        if cli.min_interval > cli.max_interval {
            bail!(
                "Minimum advertising interval {} exceeds maximum {}",
                cli.min_interval,
                cli.max_interval
            );
        }

        Ok(Self {
            device: cli.device.clone(),
            mode,
            filter_policy: cli.filter_policy.into(),
            scan: ScanParameters::default(),
            advertising: AdvertisingParameters::with_intervals(cli.min_interval, cli.max_interval),
            dwell: Duration::from_millis(cli.dwell_ms),
        })
    }
}

/// Convert a hex string to bytes, applying `policy` to a trailing odd nibble
pub fn parse_hex_payload(text: &str, policy: OddHexPolicy) -> Result<Vec<u8>> {
    let text = text.trim();
    if !text.is_ascii() {
        bail!("Invalid hex string {:?}", text);
    }
    let digits = if text.len() % 2 == 1 {
        match policy {
            OddHexPolicy::Reject => bail!("Hex string {:?} has an odd number of digits", text),
            OddHexPolicy::Truncate => {
                tracing::warn!("dropping trailing hex digit of {:?}", text);
                &text[..text.len() - 1]
            }
        }
    } else {
        text
    };

    hex::decode(digits).with_context(|| format!("Invalid hex string {:?}", text))
}
