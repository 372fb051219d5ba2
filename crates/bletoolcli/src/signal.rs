//! SIGINT wiring for the scan loop
//!
//! The handler is installed without SA_RESTART so a blocked read() returns
//! EINTR; the scan session then sees the cancelled token at its read boundary.

use bletool::CancelToken;
use std::sync::OnceLock;
use std::{io, mem, ptr};

static INTERRUPT: OnceLock<CancelToken> = OnceLock::new();

extern "C" fn on_sigint(_: libc::c_int) {
    if let Some(token) = INTERRUPT.get() {
        token.cancel();
    }
}

/// Route SIGINT to the returned token
pub fn install_interrupt_handler() -> io::Result<CancelToken> {
    let token = INTERRUPT.get_or_init(CancelToken::new).clone();

    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = on_sigint as usize;
        sa.sa_flags = 0;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGINT, &sa, ptr::null_mut()) < 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(token)
}
