//! One exported GPIO line and its sysfs attribute files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use doorhub_domain::device::Pin;

use crate::error::GpioError;

/// How many times to look for the pin directory after exporting it.
const EXPORT_ATTEMPTS: u32 = 20;
/// Delay between two looks; udev may still be fixing permissions.
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Direction a line is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    In,
    /// Output starting at the raw level that corresponds to "released".
    OutReleased,
}

/// Handle to `<root>/gpioN`.
#[derive(Debug, Clone)]
pub(crate) struct Line {
    pin: Pin,
    dir: PathBuf,
}

impl Line {
    /// Export `pin` if needed, then set its polarity and direction.
    pub(crate) async fn open(
        root: &Path,
        pin: Pin,
        active_low: bool,
        direction: Direction,
    ) -> Result<Self, GpioError> {
        let line = Self {
            pin,
            dir: root.join(format!("gpio{}", pin.0)),
        };
        if !exists(&line.dir).await {
            export(root, pin).await?;
            line.wait_exported().await?;
        }

        line.write("active_low", if active_low { "1" } else { "0" })
            .await?;
        // "high"/"low" set the raw level, so the released state depends on
        // the polarity.
        let direction = match direction {
            Direction::In => "in",
            Direction::OutReleased if active_low => "high",
            Direction::OutReleased => "low",
        };
        line.write("direction", direction).await?;
        tracing::debug!(pin = %pin, direction, active_low, "gpio line configured");
        Ok(line)
    }

    pub(crate) fn pin(&self) -> Pin {
        self.pin
    }

    /// Write the logical level.
    pub(crate) async fn set_value(&self, high: bool) -> Result<(), GpioError> {
        self.write("value", if high { "1" } else { "0" }).await
    }

    /// Read the logical level.
    pub(crate) async fn value(&self) -> Result<bool, GpioError> {
        let path = self.dir.join("value");
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| GpioError::Io {
                path: path.clone(),
                source,
            })?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(GpioError::InvalidValue {
                path,
                value: other.to_string(),
            }),
        }
    }

    async fn write(&self, attribute: &str, value: &str) -> Result<(), GpioError> {
        let path = self.dir.join(attribute);
        tokio::fs::write(&path, value)
            .await
            .map_err(|source| GpioError::Io { path, source })
    }

    async fn wait_exported(&self) -> Result<(), GpioError> {
        let direction = self.dir.join("direction");
        for _ in 0..EXPORT_ATTEMPTS {
            if exists(&direction).await {
                return Ok(());
            }
            tokio::time::sleep(EXPORT_RETRY_DELAY).await;
        }
        Err(GpioError::NotExported { pin: self.pin })
    }
}

async fn export(root: &Path, pin: Pin) -> Result<(), GpioError> {
    tracing::info!(pin = %pin, "exporting gpio line");
    tokio::fs::write(root.join("export"), pin.0.to_string())
        .await
        .map_err(|source| GpioError::Export { pin, source })
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
