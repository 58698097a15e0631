//! Relay output driven through a sysfs `value` file.

use doorhub_app::ports::RelayOutput;
use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;

use crate::line::Line;

/// A relay wired to one GPIO output line.
#[derive(Debug)]
pub struct SysfsRelay {
    line: Line,
}

impl SysfsRelay {
    pub(crate) fn new(line: Line) -> Self {
        Self { line }
    }

    #[must_use]
    pub fn pin(&self) -> Pin {
        self.line.pin()
    }
}

impl RelayOutput for SysfsRelay {
    async fn set_active(&self, active: bool) -> Result<(), DoorhubError> {
        self.line.set_value(active).await?;
        tracing::trace!(pin = %self.line.pin(), active, "relay driven");
        Ok(())
    }
}
