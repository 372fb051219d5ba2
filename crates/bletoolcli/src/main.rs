//! bletool: BLE advertise and scan tool
//!
//! Receive mode scans passively and prints each advertising payload as a hex
//! dump until Ctrl-C. Send mode advertises one payload for a fixed time.

mod cli;
mod config;
mod output;
mod signal;

use anyhow::{Context, Result};
use bletool::{AdvertiseSession, AdvertisingData, HciError, HciSocket, ScanSession};
use clap::Parser;
use cli::Cli;
use config::{Config, Mode};
use output::PayloadPrinter;
use std::io;
use tracing::{info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_cli(&cli)?;

    let result = match &config.mode {
        Mode::Receive => run_scan(&config),
        Mode::Send(data) => run_advertise(&config, data),
    };

    if let Err(e) = &result {
        if e.downcast_ref::<HciError>().is_some_and(HciError::is_channel_error) {
            warn!("check that the adapter exists, is powered on and that bletool may open raw HCI sockets (CAP_NET_RAW)");
        }
    }
    result
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn run_scan(config: &Config) -> Result<()> {
    let cancel = signal::install_interrupt_handler().context("Could not install SIGINT handler")?;
    let socket = HciSocket::open_by_name(&config.device)?;
    info!(dev_id = socket.dev_id(), "scanning, Ctrl-C to stop");

    let mut session = ScanSession::new(socket, config.scan, config.filter_policy);

    let mut printer = PayloadPrinter::new(io::stdout().lock());
    let summary = session.run(&cancel, |payload| printer.print(payload, &cancel))?;

    info!(
        reports = summary.reports,
        skipped = summary.skipped,
        malformed = summary.malformed,
        "scan stopped"
    );
    printer.finish().context("Could not write advertising payload to stdout")?;
    Ok(())
}

fn run_advertise(config: &Config, data: &AdvertisingData) -> Result<()> {
    let socket = HciSocket::open_by_name(&config.device)?;

    AdvertiseSession::new(socket, config.advertising, config.filter_policy)
        .with_dwell(config.dwell)
        .run(data)?;
    Ok(())
}
