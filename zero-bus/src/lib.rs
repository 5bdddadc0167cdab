//! Userspace access to Linux I2C buses.
//!
//! Open a bus with [`I2cBus::open`], then issue raw or register-addressed
//! transfers through the kernel's `i2c-dev` interface:
//!
//! ```no_run
//! use zero_bus::{DeviceAddress, I2cBus, RegisterAddress};
//!
//! let mut bus = I2cBus::open("/dev/i2c-1")?;
//! let eeprom = DeviceAddress::seven_bit(0x50)?;
//! let mut page = [0u8; 16];
//! bus.address_read(eeprom, RegisterAddress::word(0x0100), &mut page)?;
//! bus.close();
//! # Ok::<(), zero_bus::Error>(())
//! ```

pub mod address;
pub mod bus;
pub mod config;
pub mod error;
pub mod hw_trait;
pub mod message;
pub mod time;
pub mod tracing;
pub mod transport;

pub use address::{AddressMode, DeviceAddress, RegisterAddress};
pub use bus::I2cBus;
pub use config::BusConfig;
pub use error::{Error, Result};
pub use message::{Message, MessageFlags};
