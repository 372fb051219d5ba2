//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! allowing for communication with Bluetooth controllers.

use crate::error::HciError;
use crate::hci::channel::HciChannel;
use crate::hci::filter::{HciFilter, RawHciFilter};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use tracing::debug;

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_RAW: u16 = 0;
const SOL_HCI: i32 = 0;
const HCI_FILTER: i32 = 2;

// ioctl: _IOR('H', 210, int)
const HCIGETDEVLIST: libc::c_ulong = 0x800448D2;
const HCI_MAX_DEV: usize = 16;
// Bit 0 of dev_opt in the device list is HCI_UP
const HCI_UP: u32 = 1 << 0;

/// Represents an open raw HCI socket bound to one adapter
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
    dev_id: u16,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct HciDevReq {
    dev_id: u16,
    dev_opt: u32,
}

#[repr(C)]
struct HciDevListReq {
    dev_num: u16,
    dev_req: [HciDevReq; HCI_MAX_DEV],
}

/// An adapter known to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HciDeviceInfo {
    pub dev_id: u16,
    pub up: bool,
}

impl HciSocket {
    /// Gets the raw file descriptor for the socket
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    /// The adapter index this socket is bound to
    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }

    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        let open_failed = |source| HciError::DeviceOpenFailed {
            device: format!("hci{}", dev_id),
            source,
        };

        // Open a raw HCI socket
        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_RAW | libc::SOCK_CLOEXEC, BTPROTO_HCI) };

        if fd < 0 {
            return Err(open_failed(io::Error::last_os_error()));
        }

        // Bind to the specified device
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };

        let result = unsafe {
            libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(open_failed(err));
        }

        debug!(dev_id, fd, "opened HCI socket");
        Ok(HciSocket { fd, dev_id })
    }

    /// Opens the adapter called `name` (e.g. `hci0`)
    ///
    /// If the name does not resolve to a known adapter, the first adapter that
    /// is up is used instead.
    pub fn open_by_name(name: &str) -> Result<Self, HciError> {
        let devices = Self::devices().map_err(|source| HciError::DeviceOpenFailed {
            device: name.to_string(),
            source,
        })?;

        match resolve_device(name, &devices) {
            Some(dev_id) => Self::open(dev_id),
            None => Err(HciError::NoDevice),
        }
    }

    /// Lists the adapters the kernel knows about
    pub fn devices() -> io::Result<Vec<HciDeviceInfo>> {
        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_RAW | libc::SOCK_CLOEXEC, BTPROTO_HCI) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut list = HciDevListReq {
            dev_num: HCI_MAX_DEV as u16,
            dev_req: [HciDevReq::default(); HCI_MAX_DEV],
        };

        let ret = unsafe { libc::ioctl(fd, HCIGETDEVLIST, &mut list as *mut HciDevListReq) };
        let err = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        if ret < 0 {
            return Err(err);
        }

        let count = (list.dev_num as usize).min(HCI_MAX_DEV);
        Ok(list.dev_req[..count]
            .iter()
            .map(|req| HciDeviceInfo {
                dev_id: req.dev_id,
                up: req.dev_opt & HCI_UP != 0,
            })
            .collect())
    }

    /// Read one raw frame from the socket, packet type byte first
    ///
    /// A read interrupted by a signal returns `ErrorKind::Interrupted`.
    pub fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes_read = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };

        if bytes_read < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(bytes_read as usize)
    }

    /// Read one raw frame, giving up after `timeout`
    pub fn read_frame_timeout(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        // Set up the fd_set for select()
        let mut read_fds: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe {
            libc::FD_ZERO(&mut read_fds);
            libc::FD_SET(self.fd, &mut read_fds);
        }

        let mut timeout_val = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };

        // Wait for data to be available
        let result = unsafe {
            libc::select(
                self.fd + 1,
                &mut read_fds,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut timeout_val,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        if result == 0 {
            return Ok(None);
        }

        self.read_frame(buf).map(Some)
    }

    /// Write one complete packet to the socket
    pub fn write_packet(&self, packet: &[u8]) -> io::Result<()> {
        let written = unsafe { libc::write(self.fd, packet.as_ptr() as *const libc::c_void, packet.len()) };

        match written {
            -1 => Err(io::Error::last_os_error()),
            n if (n as usize) < packet.len() => Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write on HCI socket",
            )),
            _ => Ok(()),
        }
    }

    /// Read the filter currently installed on the socket
    pub fn get_filter(&self) -> io::Result<HciFilter> {
        let mut raw = RawHciFilter::default();
        let mut len = std::mem::size_of::<RawHciFilter>() as libc::socklen_t;

        let ret = unsafe {
            libc::getsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &mut raw as *mut RawHciFilter as *mut libc::c_void,
                &mut len,
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(HciFilter::from_raw(raw))
    }

    /// Install `filter`, replacing whatever filter was active
    pub fn install_filter(&self, filter: &HciFilter) -> io::Result<()> {
        let raw = filter.to_raw();

        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &raw as *const RawHciFilter as *const libc::c_void,
                std::mem::size_of::<RawHciFilter>() as libc::socklen_t,
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

/// Picks the adapter for `name`, falling back to the first adapter that is up
pub fn resolve_device(name: &str, devices: &[HciDeviceInfo]) -> Option<u16> {
    let requested = name
        .strip_prefix("hci")
        .and_then(|index| index.parse::<u16>().ok())
        .filter(|id| devices.iter().any(|dev| dev.dev_id == *id));

    requested.or_else(|| devices.iter().find(|dev| dev.up).map(|dev| dev.dev_id))
}

impl HciChannel for HciSocket {
    fn send_packet(&mut self, packet: &[u8]) -> io::Result<()> {
        self.write_packet(packet)
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HciSocket::read_frame(self, buf)
    }

    fn read_frame_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        HciSocket::read_frame_timeout(self, buf, timeout)
    }

    fn filter(&self) -> io::Result<HciFilter> {
        self.get_filter()
    }

    fn set_filter(&mut self, filter: &HciFilter) -> io::Result<()> {
        self.install_filter(filter)
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        debug!(dev_id = self.dev_id, "closing HCI socket");
        unsafe {
            libc::close(self.fd);
        }
    }
}
