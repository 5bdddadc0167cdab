//! I2C bus handle.
//!
//! An [`I2cBus`] owns one open bus and issues transfers on it. Every
//! operation is a single blocking submission to the transport; nothing is
//! queued, buffered or retried here.
//!
//! Methods take `&mut self`, so a handle cannot be used from two threads at
//! once without the caller serializing access (see
//! [`SharedBus`](crate::hw_trait::SharedBus)). Separate handles are
//! independent.

use std::path::{Path, PathBuf};

use crate::address::{DeviceAddress, RegisterAddress};
use crate::config::BusConfig;
use crate::error::{ConfigParam, Error, Result};
use crate::message::Message;
use crate::tracing::prelude::*;
use crate::transport::{I2cDev, Transport};

/// One open I2C bus.
#[derive(Debug)]
pub struct I2cBus<T = I2cDev> {
    path: PathBuf,
    transport: T,
}

impl I2cBus<I2cDev> {
    /// Open a bus device such as `/dev/i2c-1` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &BusConfig::default())
    }

    /// Open a bus device and apply `config`.
    ///
    /// If configuration fails the device is closed again before returning.
    pub fn open_with_config(path: impl AsRef<Path>, config: &BusConfig) -> Result<Self> {
        let path = path.as_ref();
        let dev = I2cDev::open(path).map_err(|source| {
            debug!("Failed to open {}: {}", path.display(), source);
            Error::OpenFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::with_transport(path, dev, config)
    }
}

impl<T: Transport> I2cBus<T> {
    /// Build a bus over an already open transport and apply `config`.
    ///
    /// On failure the transport is dropped.
    pub fn with_transport(
        path: impl AsRef<Path>,
        mut transport: T,
        config: &BusConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config_failed = |param, source| {
            debug!("Failed to set {} on {}: {}", param, path.display(), source);
            Error::ConfigFailed {
                path: path.clone(),
                param,
                source,
            }
        };

        transport
            .set_timeout(config.timeout_ticks())
            .map_err(|e| config_failed(ConfigParam::Timeout, e))?;
        transport
            .set_retries(config.retries)
            .map_err(|e| config_failed(ConfigParam::Retries, e))?;

        debug!(
            "Opened {} (timeout {} ms, {} retries)",
            path.display(),
            config.timeout_ms,
            config.retries
        );
        Ok(Self { path, transport })
    }

    /// Close the bus, releasing the device.
    ///
    /// The device is closed when `self` is dropped at the end of this call.
    pub fn close(self) {
        debug!("Closing {}", self.path.display());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Write `data` to the device at `addr` in one message.
    ///
    /// # Panics
    /// Panics if `data` is empty.
    pub fn write(&mut self, addr: DeviceAddress, data: &[u8]) -> Result<()> {
        assert!(!data.is_empty(), "write data must not be empty");
        self.submit(&mut [Message::write(addr, data)])
    }

    /// Fill `buffer` from the device at `addr` in one message.
    ///
    /// # Panics
    /// Panics if `buffer` is empty.
    pub fn read(&mut self, addr: DeviceAddress, buffer: &mut [u8]) -> Result<()> {
        assert!(!buffer.is_empty(), "read buffer must not be empty");
        self.submit(&mut [Message::read(addr, buffer)])
    }

    /// Write `write`, then read into `read` without releasing the bus.
    ///
    /// # Panics
    /// Panics if either slice is empty.
    pub fn write_read(&mut self, addr: DeviceAddress, write: &[u8], read: &mut [u8]) -> Result<()> {
        assert!(!write.is_empty(), "write data must not be empty");
        assert!(!read.is_empty(), "read buffer must not be empty");
        self.submit(&mut [Message::write(addr, write), Message::read(addr, read)])
    }

    /// Write `data` to register or memory location `address` of `dev_addr`.
    ///
    /// Sends one message: the address bytes followed by `data`.
    ///
    /// # Panics
    /// Panics if `data` is empty.
    pub fn address_write(
        &mut self,
        dev_addr: DeviceAddress,
        address: RegisterAddress,
        data: &[u8],
    ) -> Result<()> {
        assert!(!data.is_empty(), "write data must not be empty");
        let mut payload = Vec::with_capacity(address.size() + data.len());
        payload.extend_from_slice(&address.to_bytes());
        payload.extend_from_slice(data);
        self.submit(&mut [Message::write(dev_addr, &payload)])
    }

    /// Read into `buffer` from register or memory location `address` of
    /// `dev_addr`.
    ///
    /// Sends the address bytes and then reads, as one repeated-start
    /// transfer.
    ///
    /// # Panics
    /// Panics if `buffer` is empty.
    pub fn address_read(
        &mut self,
        dev_addr: DeviceAddress,
        address: RegisterAddress,
        buffer: &mut [u8],
    ) -> Result<()> {
        assert!(!buffer.is_empty(), "read buffer must not be empty");
        let address_bytes = address.to_bytes();
        self.submit(&mut [
            Message::write(dev_addr, &address_bytes),
            Message::read(dev_addr, buffer),
        ])
    }

    fn submit(&mut self, msgs: &mut [Message<'_>]) -> Result<()> {
        if let Some(msg) = msgs.iter().find(|m| m.len() > usize::from(u16::MAX)) {
            return Err(Error::MessageTooLong(msg.len()));
        }

        for msg in msgs.iter() {
            trace!(
                "{}: {} {} byte(s) at {}",
                self.path.display(),
                if msg.is_read() { "read" } else { "write" },
                msg.len(),
                msg.addr()
            );
        }

        self.transport.transfer(msgs).map_err(|source| {
            warn!("Transfer on {} failed: {}", self.path.display(), source);
            Error::TransferFailed {
                path: self.path.clone(),
                source,
            }
        })
    }
}
