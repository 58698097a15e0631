//! Virtual relay — remembers the levels it was driven to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use doorhub_app::ports::RelayOutput;
use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;

/// A simulated relay output.
#[derive(Debug)]
pub struct VirtualRelay {
    pin: Pin,
    levels: Mutex<Vec<bool>>,
    faulty: AtomicBool,
}

impl VirtualRelay {
    #[must_use]
    pub fn new(pin: Pin) -> Self {
        Self {
            pin,
            levels: Mutex::new(Vec::new()),
            faulty: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Every level written so far, oldest first.
    #[must_use]
    pub fn levels(&self) -> Vec<bool> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the relay is currently energised.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
            .unwrap_or(false)
    }

    /// Make every following attempt to energise the relay fail.
    /// Releasing always succeeds.
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::SeqCst);
    }
}

impl RelayOutput for VirtualRelay {
    async fn set_active(&self, active: bool) -> Result<(), DoorhubError> {
        if active && self.faulty.load(Ordering::SeqCst) {
            tracing::debug!(pin = %self.pin, "virtual relay fault injected");
            return Err(DoorhubError::hardware(std::io::Error::other(format!(
                "virtual relay on pin {} is faulty",
                self.pin
            ))));
        }
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(active);
        tracing::debug!(pin = %self.pin, active, "virtual relay driven");
        Ok(())
    }
}
