//! Transport layer underneath a bus handle.
//!
//! This module defines the primitive a bus handle drives: submit an ordered
//! list of messages as one atomic transfer, plus the two setup calls made
//! when a bus is opened. The Linux implementation talks to `/dev/i2c-N`
//! through ioctls; tests use a recording mock.

pub mod linux;
#[cfg(test)]
pub(crate) mod mock;

pub use linux::I2cDev;

use crate::message::Message;

/// Largest number of messages the kernel accepts in one transfer.
pub const MAX_MESSAGES: usize = 42;

/// The primitive a bus handle is built on.
///
/// Errors are raw platform codes; the bus handle attaches context.
pub trait Transport {
    /// Set the response timeout, in kernel ticks of 10 ms.
    fn set_timeout(&mut self, ticks: u32) -> nix::Result<()>;

    /// Set how many times the adapter retries a transfer on arbitration loss.
    fn set_retries(&mut self, retries: u32) -> nix::Result<()>;

    /// Execute `msgs` in order as one combined transfer.
    ///
    /// The bus is not released between messages, so a write followed by a
    /// read forms a repeated-start sequence.
    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> nix::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_timeout(&mut self, ticks: u32) -> nix::Result<()> {
        (**self).set_timeout(ticks)
    }

    fn set_retries(&mut self, retries: u32) -> nix::Result<()> {
        (**self).set_retries(retries)
    }

    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> nix::Result<()> {
        (**self).transfer(msgs)
    }
}
