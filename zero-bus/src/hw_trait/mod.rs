//! Hardware abstraction layer traits.
//!
//! This module defines the async I2C interface device drivers are written
//! against, and [`SharedBus`], which implements it over a blocking
//! [`I2cBus`] so several tasks can share one bus.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::address::{DeviceAddress, RegisterAddress};
use crate::bus::I2cBus;
use crate::error::{Error, Result};
use crate::transport::{I2cDev, Transport};

/// I2C bus abstraction for drivers.
///
/// Addresses are 7-bit.
#[async_trait]
pub trait I2c: Send {
    /// Write data to an I2C device.
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Read data from an I2C device.
    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()>;

    /// Write data then read from an I2C device (repeated start).
    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()>;
}

/// A bus handle shared between tasks.
///
/// Clones refer to the same bus. Each transaction holds the lock from start
/// to finish, so transfers issued from different tasks never interleave on
/// the wire. The blocking ioctl runs on tokio's blocking pool.
pub struct SharedBus<T = I2cDev> {
    inner: Arc<Mutex<I2cBus<T>>>,
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + Send + 'static> SharedBus<T> {
    pub fn new(bus: I2cBus<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bus)),
        }
    }

    /// Lock the bus for direct blocking use.
    pub fn lock(&self) -> MutexGuard<'_, I2cBus<T>> {
        self.inner.lock()
    }

    /// Run `op` against the locked bus on the blocking pool.
    ///
    /// A panic in `op` is resumed on the calling task.
    async fn run<R, F>(&self, op: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut I2cBus<T>) -> Result<R> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || op(&mut *inner.lock())).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::Task(e.to_string())),
        }
    }

    /// Async form of [`I2cBus::address_write`].
    pub async fn address_write(
        &self,
        dev_addr: DeviceAddress,
        address: RegisterAddress,
        data: &[u8],
    ) -> Result<()> {
        let data = data.to_vec();
        self.run(move |bus| bus.address_write(dev_addr, address, &data))
            .await
    }

    /// Async form of [`I2cBus::address_read`].
    pub async fn address_read(
        &self,
        dev_addr: DeviceAddress,
        address: RegisterAddress,
        buffer: &mut [u8],
    ) -> Result<()> {
        let len = buffer.len();
        let data = self
            .run(move |bus| {
                let mut data = vec![0u8; len];
                bus.address_read(dev_addr, address, &mut data)?;
                Ok(data)
            })
            .await?;
        buffer.copy_from_slice(&data);
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + Send + 'static> I2c for SharedBus<T> {
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let addr = DeviceAddress::seven_bit(addr)?;
        let data = data.to_vec();
        self.run(move |bus| bus.write(addr, &data)).await
    }

    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        let addr = DeviceAddress::seven_bit(addr)?;
        let len = buffer.len();
        let data = self
            .run(move |bus| {
                let mut data = vec![0u8; len];
                bus.read(addr, &mut data)?;
                Ok(data)
            })
            .await?;
        buffer.copy_from_slice(&data);
        Ok(())
    }

    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        let addr = DeviceAddress::seven_bit(addr)?;
        let write = write.to_vec();
        let len = read.len();
        let data = self
            .run(move |bus| {
                let mut data = vec![0u8; len];
                bus.write_read(addr, &write, &mut data)?;
                Ok(data)
            })
            .await?;
        read.copy_from_slice(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::message::MessageFlags;
    use crate::transport::mock::MockTransport;
    use nix::errno::Errno;
    use serial_test::serial;

    fn shared(transport: MockTransport) -> SharedBus<MockTransport> {
        SharedBus::new(
            I2cBus::with_transport("/dev/i2c-mock", transport, &BusConfig::default()).unwrap(),
        )
    }

    // Drivers are written against the trait, not the concrete bus
    async fn read_register<I: I2c>(i2c: &mut I, addr: u8, register: u8) -> Result<u8> {
        let mut data = [0u8; 1];
        i2c.write_read(addr, &[register], &mut data).await?;
        Ok(data[0])
    }

    #[tokio::test]
    #[serial]
    async fn test_write_read_through_trait() {
        let mut bus = shared(MockTransport::with_responses([vec![0x5A]]));
        assert_eq!(read_register(&mut bus, 0x24, 0x20).await.unwrap(), 0x5A);

        let guard = bus.lock();
        let msgs = &guard.transport().submissions[0];
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].data, vec![0x20]);
        assert_eq!(msgs[1].flags, MessageFlags::READ);
    }

    #[tokio::test]
    #[serial]
    async fn test_write_and_read() {
        let mut bus = shared(MockTransport::with_responses([vec![7, 8]]));
        bus.write(0x50, &[1, 2]).await.unwrap();
        let mut buf = [0u8; 2];
        bus.read(0x50, &mut buf).await.unwrap();
        assert_eq!(buf, [7, 8]);
        assert_eq!(bus.lock().transport().submissions.len(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_rejects_wide_address() {
        let mut bus = shared(MockTransport::default());
        let err = bus.write(0x80, &[0]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidDeviceAddress(_)));
        assert!(bus.lock().transport().submissions.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_transfer_error_propagates() {
        let mut bus = shared(MockTransport::failing_transfer(Errno::ENXIO));
        let err = bus.write(0x50, &[0]).await.unwrap_err();
        assert_eq!(err.errno(), Some(Errno::ENXIO));
    }

    #[tokio::test]
    #[serial]
    async fn test_register_access() {
        let bus = shared(MockTransport::with_responses([vec![0xAB, 0xCD]]));
        let dev = DeviceAddress::seven_bit(0x50).unwrap();
        bus.address_write(dev, RegisterAddress::word(0x0010), &[0xAA])
            .await
            .unwrap();
        let mut buf = [0u8; 2];
        bus.address_read(dev, RegisterAddress::word(0x0010), &mut buf)
            .await
            .unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);

        let guard = bus.lock();
        let submissions = &guard.transport().submissions;
        assert_eq!(submissions[0][0].data, vec![0x00, 0x10, 0xAA]);
        assert_eq!(submissions[1][0].data, vec![0x00, 0x10]);
    }

    #[tokio::test]
    #[serial]
    #[should_panic(expected = "read buffer must not be empty")]
    async fn test_empty_read_panics() {
        let mut bus = shared(MockTransport::default());
        let _ = bus.read(0x50, &mut []).await;
    }

    #[tokio::test]
    #[serial]
    #[should_panic(expected = "write data must not be empty")]
    async fn test_empty_register_write_panics() {
        let bus = shared(MockTransport::default());
        let dev = DeviceAddress::seven_bit(0x50).unwrap();
        let _ = bus.address_write(dev, RegisterAddress::byte(0), &[]).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[serial]
    async fn test_concurrent_transactions_submit_whole() {
        let bus = shared(MockTransport::default());
        let mut tasks = Vec::new();
        for i in 0..16u8 {
            let mut bus = bus.clone();
            tasks.push(tokio::spawn(async move {
                let mut buf = [0u8; 1];
                bus.write_read(0x40 + (i % 4), &[i], &mut buf).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Each transaction reaches the transport as one two-message submission
        let guard = bus.lock();
        let submissions = &guard.transport().submissions;
        assert_eq!(submissions.len(), 16);
        let mut seen: Vec<u8> = submissions.iter().map(|msgs| msgs[0].data[0]).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<u8>>());
        for msgs in submissions {
            assert_eq!(msgs.len(), 2);
            let i = msgs[0].data[0];
            let addr = DeviceAddress::seven_bit(0x40 + (i % 4)).unwrap();
            assert_eq!(msgs[0].addr, addr);
            assert_eq!(msgs[1].addr, addr);
            assert_eq!(msgs[1].flags, MessageFlags::READ);
        }
    }
}
