//! Packed I2C address types.
//!
//! Two 32-bit packed encodings are used on the bus API:
//!
//! - [`DeviceAddress`]: the slave address. Bit 31 selects the addressing
//!   mode (clear for 7-bit, set for 10-bit); the address itself sits in the
//!   low 7 or 10 bits and every other bit is zero.
//! - [`RegisterAddress`]: a register or memory location inside the slave.
//!   Bits 0-29 hold the value, bits 30-31 the number of bytes (0-3) the
//!   address occupies on the wire.
//!
//! Both are encoded and decoded with explicit shifts and masks so the raw
//! representation does not depend on compiler bit-field layout.

use crate::error::{Error, Result};

/// Addressing mode of a slave device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    SevenBit,
    TenBit,
}

/// A 7-bit or 10-bit I2C slave address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress(u32);

impl DeviceAddress {
    /// Mode discriminant, bit 31.
    pub const MODE_MASK: u32 = 1 << 31;
    pub const MODE_7BIT: u32 = 0 << 31;
    pub const MODE_10BIT: u32 = 1 << 31;

    /// Largest 7-bit address.
    pub const MAX_7BIT: u16 = 0x7F;
    /// Largest 10-bit address.
    pub const MAX_10BIT: u16 = 0x3FF;

    /// Create a 7-bit address.
    pub fn seven_bit(addr: u8) -> Result<Self> {
        if u16::from(addr) > Self::MAX_7BIT {
            return Err(Error::InvalidDeviceAddress(format!(
                "0x{addr:02X} does not fit in 7 bits"
            )));
        }
        Ok(Self(u32::from(addr) | Self::MODE_7BIT))
    }

    /// Create a 10-bit address.
    pub fn ten_bit(addr: u16) -> Result<Self> {
        if addr > Self::MAX_10BIT {
            return Err(Error::InvalidDeviceAddress(format!(
                "0x{addr:03X} does not fit in 10 bits"
            )));
        }
        Ok(Self(u32::from(addr) | Self::MODE_10BIT))
    }

    /// Create an address in the given mode.
    pub fn new(addr: u16, mode: AddressMode) -> Result<Self> {
        match mode {
            AddressMode::SevenBit => {
                let narrow = u8::try_from(addr).map_err(|_| {
                    Error::InvalidDeviceAddress(format!("0x{addr:X} does not fit in 7 bits"))
                })?;
                Self::seven_bit(narrow)
            }
            AddressMode::TenBit => Self::ten_bit(addr),
        }
    }

    /// Decode a packed address.
    ///
    /// The discriminant is read first; bits above the mode's width must be
    /// zero.
    pub fn from_raw(raw: u32) -> Result<Self> {
        let width_mask = match raw & Self::MODE_MASK {
            Self::MODE_7BIT => u32::from(Self::MAX_7BIT),
            _ => u32::from(Self::MAX_10BIT),
        };
        let stray = raw & !Self::MODE_MASK & !width_mask;
        if stray != 0 {
            return Err(Error::InvalidDeviceAddress(format!(
                "raw value 0x{raw:08X} has bits set outside the address field"
            )));
        }
        Ok(Self(raw))
    }

    /// The packed representation.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    pub const fn mode(self) -> AddressMode {
        if self.0 & Self::MODE_MASK == Self::MODE_7BIT {
            AddressMode::SevenBit
        } else {
            AddressMode::TenBit
        }
    }

    pub const fn is_seven_bit(self) -> bool {
        matches!(self.mode(), AddressMode::SevenBit)
    }

    /// The address with the mode bit stripped.
    pub const fn addr(self) -> u16 {
        (self.0 & !Self::MODE_MASK) as u16
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = Error;

    fn try_from(addr: u8) -> Result<Self> {
        Self::seven_bit(addr)
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode() {
            AddressMode::SevenBit => write!(f, "0x{:02X}", self.addr()),
            AddressMode::TenBit => write!(f, "0x{:03X} (10-bit)", self.addr()),
        }
    }
}

/// A register or memory address inside a slave device, with its wire size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress(u32);

impl RegisterAddress {
    pub const SIZE_OFFSET: u32 = 30;
    pub const VALUE_MASK: u32 = (1 << Self::SIZE_OFFSET) - 1;
    /// Largest size tag; a register address never exceeds three bytes.
    pub const MAX_SIZE: usize = 3;

    /// Create a register address occupying `size` bytes on the wire.
    ///
    /// `value` must fit in `size` bytes, so a zero-size address can only
    /// carry zero.
    pub fn new(value: u32, size: usize) -> Result<Self> {
        if size > Self::MAX_SIZE {
            return Err(Error::InvalidRegisterAddress(format!(
                "size {size} exceeds {} bytes",
                Self::MAX_SIZE
            )));
        }
        if value >> (8 * size) != 0 {
            return Err(Error::InvalidRegisterAddress(format!(
                "0x{value:X} does not fit in {size} byte(s)"
            )));
        }
        Ok(Self(((size as u32) << Self::SIZE_OFFSET) | value))
    }

    /// One-byte register address, the common case.
    pub const fn byte(value: u8) -> Self {
        Self((1 << Self::SIZE_OFFSET) | value as u32)
    }

    /// Two-byte register address, as used by larger EEPROMs.
    pub const fn word(value: u16) -> Self {
        Self((2 << Self::SIZE_OFFSET) | value as u32)
    }

    /// Decode a packed address, checking the size tag against the value.
    pub fn from_raw(raw: u32) -> Result<Self> {
        Self::new(raw & Self::VALUE_MASK, (raw >> Self::SIZE_OFFSET) as usize)
    }

    /// The packed representation.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    pub const fn value(self) -> u32 {
        self.0 & Self::VALUE_MASK
    }

    /// Number of bytes the address occupies on the wire.
    pub const fn size(self) -> usize {
        (self.0 >> Self::SIZE_OFFSET) as usize
    }

    /// The wire bytes, most significant first, exactly `size()` long.
    pub fn to_bytes(self) -> Vec<u8> {
        let be = self.value().to_be_bytes();
        be[be.len() - self.size()..].to_vec()
    }
}

impl std::fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:0width$X}", self.value(), width = self.size().max(1) * 2)
    }
}
