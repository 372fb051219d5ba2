//! Example: LE Scanning
//!
//! Passively scans on hci0 for ten seconds and prints every advertising payload.

use bletool::hexdump::hex_dump;
use bletool::{CancelToken, FilterPolicy, HciSocket, ScanParameters, ScanSession};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Opening HCI socket for hci0...");
    let socket = HciSocket::open_by_name("hci0")?;

    let cancel = CancelToken::new();
    let stopper = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(10));
        stopper.cancel();
    });

    // The timer thread cannot interrupt a blocked read, so the loop ends at
    // the first report after the ten seconds are up
    let mut session = ScanSession::new(socket, ScanParameters::default(), FilterPolicy::PerCommand);
    let summary = session.run(&cancel, |payload| print!("{}", hex_dump(payload.as_ref())))?;

    println!("Stopped scanning after {} reports", summary.reports);
    Ok(())
}
