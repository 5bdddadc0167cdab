//! Bus configuration.
//!
//! The kernel lets userspace tune two things per open bus: how long the
//! adapter waits for a response and how many times it retries. Defaults
//! match what the bus has always been opened with (20 ms, 2 retries);
//! environment variables or a JSON file can override them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Length of one kernel `I2C_TIMEOUT` tick.
pub const TIMEOUT_TICK: Duration = Duration::from_millis(10);

/// Environment variable overriding the response timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "ZERO_I2C_TIMEOUT_MS";
/// Environment variable overriding the retry count.
pub const RETRIES_ENV: &str = "ZERO_I2C_RETRIES";

const DEFAULT_TIMEOUT_MS: u64 = 20;
const DEFAULT_RETRIES: u32 = 2;

/// Parameters applied to a bus when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BusConfig {
    /// Response timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Adapter retry count
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl BusConfig {
    /// Defaults, overridden by `ZERO_I2C_TIMEOUT_MS` and `ZERO_I2C_RETRIES`.
    ///
    /// Unset or unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: lookup(TIMEOUT_ENV)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(defaults.timeout_ms),
            retries: lookup(RETRIES_ENV)
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(defaults.retries),
        }
    }

    /// Load configuration from a JSON file; missing fields take defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The timeout in kernel ticks, rounded up, at least one tick.
    pub fn timeout_ticks(&self) -> u32 {
        let tick_ms = TIMEOUT_TICK.as_millis() as u64;
        let ticks = self.timeout_ms.div_ceil(tick_ms).max(1);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}
