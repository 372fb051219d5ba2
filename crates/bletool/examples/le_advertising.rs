//! Example: LE Advertising
//!
//! Advertises a two-byte payload after the fixed preamble for five seconds.

use bletool::{AdvertiseSession, AdvertisingData, AdvertisingParameters, FilterPolicy, HciSocket};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = match HciSocket::open_by_name("hci0") {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("Failed to open HCI socket: {}", e);
            eprintln!("This might be because:");
            eprintln!("1. No Bluetooth adapter is available");
            eprintln!("2. The Bluetooth adapter is not powered on");
            eprintln!("3. You don't have sufficient permissions to access the Bluetooth device");
            return Err(e.into());
        }
    };

    let data = AdvertisingData::new(&[0x01, 0x02])?;

    let mut session = AdvertiseSession::new(socket, AdvertisingParameters::default(), FilterPolicy::PerCommand)
        .with_dwell(Duration::from_secs(5));

    println!("Advertising for 5 seconds...");
    session.run(&data)?;
    println!("Stopped advertising");

    Ok(())
}
