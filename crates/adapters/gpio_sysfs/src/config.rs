//! sysfs GPIO configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where the GPIO class lives and how lines are driven.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// sysfs GPIO class directory.
    pub sysfs_root: PathBuf,
    /// Interval between two reads of a sense line, in milliseconds.
    pub poll_interval_ms: u64,
    /// Invert the electrical polarity of every line.
    pub active_low: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/gpio"),
            poll_interval_ms: 10,
            active_low: false,
        }
    }
}

impl GpioConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
