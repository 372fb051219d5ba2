//! Payload output for receive mode
//!
//! Dumps go to stdout. A failed write (typically EPIPE once the reading end
//! of a pipe has gone away) stops the scan instead of being dropped.

use bletool::hexdump::hex_dump;
use bletool::{AdvertisingPayload, CancelToken};
use std::io::{self, Write};
use tracing::warn;

pub struct PayloadPrinter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> PayloadPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// Dump `payload`; on a write error remember it and cancel the scan
    pub fn print(&mut self, payload: &AdvertisingPayload, cancel: &CancelToken) {
        if self.error.is_some() {
            return;
        }

        let written = self
            .out
            .write_all(hex_dump(payload.as_ref()).as_bytes())
            .and_then(|()| self.out.flush());

        if let Err(e) = written {
            warn!(error = %e, "could not write payload, stopping scan");
            self.error = Some(e);
            cancel.cancel();
        }
    }

    /// The first write error, if any
    pub fn finish(self) -> io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
