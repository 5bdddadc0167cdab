//! Linux `i2c-dev` transport.
//!
//! Wraps an open `/dev/i2c-N` descriptor and issues the `I2C_TIMEOUT`,
//! `I2C_RETRIES` and `I2C_RDWR` ioctls.
//!
//! Reference: <https://www.kernel.org/doc/Documentation/i2c/dev-interface>

use nix::{
    errno::Errno,
    fcntl::{self, OFlag},
    libc::c_int,
    sys::stat::Mode,
};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;

use super::{Transport, MAX_MESSAGES};
use crate::message::Message;
use crate::tracing::prelude::*;

mod ffi {
    use nix::{ioctl_readwrite_bad, ioctl_write_int_bad};

    /// `struct i2c_msg` from `<linux/i2c.h>`
    #[repr(C)]
    pub struct I2cMsg {
        pub addr: u16,
        pub flags: u16,
        pub len: u16,
        pub buf: *mut u8,
    }

    /// `struct i2c_rdwr_ioctl_data` from `<linux/i2c-dev.h>`
    #[repr(C)]
    pub struct I2cRdwrIoctlData {
        pub msgs: *mut I2cMsg,
        pub nmsgs: u32,
    }

    ioctl_write_int_bad!(i2c_retries, 0x0701);
    ioctl_write_int_bad!(i2c_timeout, 0x0702);
    ioctl_readwrite_bad!(i2c_rdwr, 0x0707, I2cRdwrIoctlData);
}

/// An open `/dev/i2c-N` character device.
///
/// The descriptor is closed when the value is dropped.
#[derive(Debug)]
pub struct I2cDev {
    fd: OwnedFd,
}

impl I2cDev {
    /// Open the device read-write.
    pub fn open(path: &Path) -> nix::Result<Self> {
        let raw = fcntl::open(path, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())?;
        // SAFETY: open() just returned this descriptor and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self { fd })
    }
}

impl AsFd for I2cDev {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for I2cDev {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

fn to_c_int(value: u32) -> nix::Result<c_int> {
    c_int::try_from(value).map_err(|_| Errno::EINVAL)
}

fn to_raw_msg(msg: &mut Message<'_>) -> nix::Result<ffi::I2cMsg> {
    let flags = msg.flags().bits();
    let addr = msg.addr().addr();
    let len = u16::try_from(msg.len()).map_err(|_| Errno::EINVAL)?;
    let buf = match msg {
        // The kernel only reads from write buffers.
        Message::Write { data, .. } => data.as_ptr().cast_mut(),
        Message::Read { buffer, .. } => buffer.as_mut_ptr(),
    };
    Ok(ffi::I2cMsg {
        addr,
        flags,
        len,
        buf,
    })
}

impl Transport for I2cDev {
    fn set_timeout(&mut self, ticks: u32) -> nix::Result<()> {
        let ticks = to_c_int(ticks)?;
        // SAFETY: I2C_TIMEOUT takes its argument by value.
        unsafe { ffi::i2c_timeout(self.fd.as_raw_fd(), ticks) }?;
        Ok(())
    }

    fn set_retries(&mut self, retries: u32) -> nix::Result<()> {
        let retries = to_c_int(retries)?;
        // SAFETY: I2C_RETRIES takes its argument by value.
        unsafe { ffi::i2c_retries(self.fd.as_raw_fd(), retries) }?;
        Ok(())
    }

    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> nix::Result<()> {
        if msgs.is_empty() || msgs.len() > MAX_MESSAGES {
            return Err(Errno::EINVAL);
        }

        let mut raw = msgs
            .iter_mut()
            .map(to_raw_msg)
            .collect::<nix::Result<Vec<_>>>()?;
        let mut data = ffi::I2cRdwrIoctlData {
            msgs: raw.as_mut_ptr(),
            nmsgs: raw.len() as u32,
        };

        // SAFETY: every buf pointer in `raw` comes from a slice borrowed by
        // `msgs`, which outlives this call, and each len matches its slice.
        let done = unsafe { ffi::i2c_rdwr(self.fd.as_raw_fd(), &mut data) }?;
        trace!("I2C_RDWR completed {} of {} message(s)", done, raw.len());
        Ok(())
    }
}
