//! Transfer message descriptors.
//!
//! A [`Message`] describes one segment of a combined transfer: target
//! address, direction and the borrowed buffer. Messages live only for the
//! duration of one submission.

use bitflags::bitflags;

use crate::address::{AddressMode, DeviceAddress};

bitflags! {
    /// Per-message flags, bit-compatible with the kernel's `i2c_msg.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MessageFlags: u16 {
        /// Read from the slave (`I2C_M_RD`)
        const READ = 0x0001;
        /// Target uses a 10-bit address (`I2C_M_TEN`)
        const TEN = 0x0010;
    }
}

/// One segment of a transfer.
#[derive(Debug)]
pub enum Message<'a> {
    Write {
        addr: DeviceAddress,
        data: &'a [u8],
    },
    Read {
        addr: DeviceAddress,
        buffer: &'a mut [u8],
    },
}

impl<'a> Message<'a> {
    pub fn write(addr: DeviceAddress, data: &'a [u8]) -> Self {
        Message::Write { addr, data }
    }

    pub fn read(addr: DeviceAddress, buffer: &'a mut [u8]) -> Self {
        Message::Read { addr, buffer }
    }

    pub fn addr(&self) -> DeviceAddress {
        match self {
            Message::Write { addr, .. } | Message::Read { addr, .. } => *addr,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Message::Write { data, .. } => data.len(),
            Message::Read { buffer, .. } => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Message::Read { .. })
    }

    pub fn flags(&self) -> MessageFlags {
        let mut flags = MessageFlags::empty();
        if self.is_read() {
            flags |= MessageFlags::READ;
        }
        if self.addr().mode() == AddressMode::TenBit {
            flags |= MessageFlags::TEN;
        }
        flags
    }
}
