//! sysfs GPIO adapter error types.

use std::path::PathBuf;

use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;

/// Errors specific to the sysfs GPIO adapter.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// Writing the pin number to the `export` file failed.
    #[error("failed to export pin {pin}")]
    Export {
        pin: Pin,
        #[source]
        source: std::io::Error,
    },

    /// The kernel did not create the pin directory after export.
    #[error("pin {pin} did not appear after export")]
    NotExported { pin: Pin },

    /// Reading or writing a pin attribute failed.
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `value` file held something other than `0` or `1`.
    #[error("unexpected value {value:?} in {}", path.display())]
    InvalidValue { path: PathBuf, value: String },
}

impl GpioError {
    /// Convert into a [`DoorhubError::Hardware`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> DoorhubError {
        DoorhubError::hardware(self)
    }
}

impl From<GpioError> for DoorhubError {
    fn from(err: GpioError) -> Self {
        err.into_domain()
    }
}
