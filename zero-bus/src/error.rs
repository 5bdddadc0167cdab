//! Common error types for zero-bus.
//!
//! This module provides a closed Error enum using thiserror. Platform
//! failures carry the errno reported by the kernel so callers can dispatch
//! on the failure kind and still see the underlying code.

use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Bus parameter set through an ioctl while opening a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigParam {
    Timeout,
    Retries,
}

impl std::fmt::Display for ConfigParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigParam::Timeout => write!(f, "timeout"),
            ConfigParam::Retries => write!(f, "retries"),
        }
    }
}

/// Main error type for zero-bus operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The bus device could not be opened
    #[error("Failed to open {}: {source}", .path.display())]
    OpenFailed { path: PathBuf, source: Errno },

    /// The bus opened, but setting a transport parameter failed
    #[error("Failed to set {param} on {}: {source}", .path.display())]
    ConfigFailed {
        path: PathBuf,
        param: ConfigParam,
        source: Errno,
    },

    /// The kernel rejected or failed a transfer
    #[error("Transfer failed on {}: {source}", .path.display())]
    TransferFailed { path: PathBuf, source: Errno },

    /// Device address out of range for its addressing mode
    #[error("Invalid device address: {0}")]
    InvalidDeviceAddress(String),

    /// Register address value or size tag out of range
    #[error("Invalid register address: {0}")]
    InvalidRegisterAddress(String),

    /// A single message exceeds what the kernel descriptor can carry
    #[error("Message of {0} bytes exceeds the {max} byte limit", max = u16::MAX)]
    MessageTooLong(usize),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors outside the transfer path (config files and the like)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking transfer task was cancelled
    #[error("Transfer task failed: {0}")]
    Task(String),
}

impl Error {
    /// The platform error code behind this error, if there is one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::OpenFailed { source, .. }
            | Error::ConfigFailed { source, .. }
            | Error::TransferFailed { source, .. } => Some(*source),
            Error::Io(e) => e.raw_os_error().map(Errno::from_raw),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
