//! # doorhub-adapter-gpio-sysfs
//!
//! Hardware adapter driving GPIO lines through the Linux sysfs interface
//! (`/sys/class/gpio`).
//!
//! ## Provided lines
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`SysfsRelay`] | `RelayOutput` | Writes the logical level to `value`; starts released |
//! | [`SysfsInput`] | `SenseInput` | Polls `value` and reports level changes as edges |
//!
//! Lines are exported on demand through `<root>/export`. Polarity is set
//! with `active_low` so that "active" always means "relay energised" or
//! "input asserted".
//!
//! ## Dependency rule
//!
//! Depends on `doorhub-app` (port traits) and `doorhub-domain` only.

pub mod config;
pub mod error;
mod input;
mod line;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use doorhub_domain::device::Pin;

pub use config::GpioConfig;
pub use error::GpioError;
pub use input::SysfsInput;
pub use output::SysfsRelay;

use line::{Direction, Line};

/// Opens GPIO lines below one sysfs root.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    active_low: bool,
    poll_interval: Duration,
}

impl SysfsGpio {
    #[must_use]
    pub fn new(config: &GpioConfig) -> Self {
        Self {
            root: config.sysfs_root.clone(),
            active_low: config.active_low,
            poll_interval: config.poll_interval(),
        }
    }

    /// Export and configure `pin` as a relay output, released.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError`] if the line cannot be exported or configured.
    pub async fn relay(&self, pin: Pin) -> Result<SysfsRelay, GpioError> {
        let line = Line::open(&self.root, pin, self.active_low, Direction::OutReleased).await?;
        Ok(SysfsRelay::new(line))
    }

    /// Export and configure `pin` as a polled sense input.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError`] if the line cannot be exported or configured.
    pub async fn input(&self, pin: Pin) -> Result<SysfsInput, GpioError> {
        let line = Line::open(&self.root, pin, self.active_low, Direction::In).await?;
        Ok(SysfsInput::new(
            line,
            tokio::time::interval(self.poll_interval),
        ))
    }
}
