//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`DoorhubError`] via `#[from]` at the port boundaries.

/// Top-level error shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum DoorhubError {
    /// A domain invariant was violated by the input.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A lookup by name found nothing.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The device refused the requested transition.
    #[error("device refused the operation")]
    Device(#[from] DeviceError),

    /// Relay or sense line fault reported by a hardware adapter.
    #[error("hardware error")]
    Hardware(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations on domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A device or monitor name was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// A device name contained a character outside `[A-Za-z0-9_-]`.
    #[error("name {0:?} contains characters outside [A-Za-z0-9_-]")]
    InvalidName(String),

    /// Two devices were registered under the same name.
    #[error("device {0:?} is registered twice")]
    DuplicateName(String),

    /// A device already carries its maximum number of notification sinks.
    #[error("device {device:?} already has {limit} notification sinks")]
    TooManySinks {
        /// Name of the device.
        device: String,
        /// The sink limit.
        limit: usize,
    },
}

/// A named resource could not be found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {name:?} not found")]
pub struct NotFoundError {
    /// Kind of resource (e.g. `"Device"`).
    pub entity: &'static str,
    /// The name that was looked up.
    pub name: String,
}

/// Refusals produced by the actuator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// `open` was requested while the lock flag is set.
    #[error("device is locked")]
    Locked,

    /// An actuation pulse is in flight.
    #[error("device is busy")]
    Busy,
}

impl DoorhubError {
    /// Wrap an adapter-specific hardware fault.
    pub fn hardware(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Hardware(Box::new(err))
    }
}
