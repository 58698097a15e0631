//! Device — a relay-driven actuator and the state machine guarding it.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, ValidationError};

/// Unique, URL-safe name of a device (e.g. `door`, `gate`).
///
/// The name appears in request paths and in push-event topics
/// (`<name>_status`), so it is restricted to `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceName(String);

impl DeviceName {
    /// Validate and wrap a device name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] for an empty name and
    /// [`ValidationError::InvalidName`] when it holds a forbidden character.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidName(name));
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceName> for String {
    fn from(value: DeviceName) -> Self {
        value.0
    }
}

/// Hardware line number a relay or sense input is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(pub u32);

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// State of an actuator.
///
/// ```text
///            set_locked(true)
///   Idle{false} ───────────────► Idle{true}
///      │  ▲     ◄───────────────
///      │  │     set_locked(false)
/// begin│  │finish
///      ▼  │
///   Actuating
/// ```
///
/// `open` is only valid from `Idle { locked: false }`; nothing but
/// `finish_open` is valid while `Actuating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle { locked: bool },
    Actuating,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::Idle { locked: false }
    }
}

impl DeviceState {
    /// Whether the lock flag is set. Always `false` while actuating,
    /// since actuation can only start from the unlocked state.
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Idle { locked: true })
    }

    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Actuating)
    }

    /// Enter `Actuating`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Locked`] from `Idle { locked: true }`,
    /// [`DeviceError::Busy`] from `Actuating`. The state is left untouched
    /// on error.
    pub fn begin_open(&mut self) -> Result<(), DeviceError> {
        match *self {
            Self::Idle { locked: false } => {
                *self = Self::Actuating;
                Ok(())
            }
            Self::Idle { locked: true } => Err(DeviceError::Locked),
            Self::Actuating => Err(DeviceError::Busy),
        }
    }

    /// Leave `Actuating` and return to the unlocked idle state.
    pub fn finish_open(&mut self) {
        *self = Self::Idle { locked: false };
    }

    /// Set the lock flag. Setting the current value again is accepted.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Busy`] while `Actuating`.
    pub fn set_locked(&mut self, locked: bool) -> Result<(), DeviceError> {
        match *self {
            Self::Idle { .. } => {
                *self = Self::Idle { locked };
                Ok(())
            }
            Self::Actuating => Err(DeviceError::Busy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_url_safe_names() {
        assert_eq!(DeviceName::new("front-door_2").unwrap().as_str(), "front-door_2");
    }

    #[test]
    fn should_reject_empty_name() {
        assert_eq!(DeviceName::new(""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn should_reject_name_with_slash() {
        assert!(matches!(
            DeviceName::new("door/lock"),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn should_reject_invalid_name_when_deserializing() {
        let result: Result<DeviceName, _> = serde_json::from_str("\"bad name\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_start_idle_and_unlocked() {
        let state = DeviceState::default();
        assert!(!state.is_locked());
        assert!(!state.is_busy());
    }

    #[test]
    fn should_enter_actuating_when_opened_unlocked() {
        let mut state = DeviceState::default();
        state.begin_open().unwrap();
        assert_eq!(state, DeviceState::Actuating);
        state.finish_open();
        assert_eq!(state, DeviceState::Idle { locked: false });
    }

    #[test]
    fn should_refuse_open_when_locked_and_keep_flag() {
        let mut state = DeviceState::Idle { locked: true };
        assert_eq!(state.begin_open(), Err(DeviceError::Locked));
        assert!(state.is_locked());
    }

    #[test]
    fn should_refuse_second_open_while_actuating() {
        let mut state = DeviceState::Actuating;
        assert_eq!(state.begin_open(), Err(DeviceError::Busy));
    }

    #[test]
    fn should_refuse_lock_change_while_actuating() {
        let mut state = DeviceState::Actuating;
        assert_eq!(state.set_locked(true), Err(DeviceError::Busy));
        assert_eq!(state, DeviceState::Actuating);
    }

    #[test]
    fn should_accept_setting_same_lock_value_twice() {
        let mut state = DeviceState::default();
        state.set_locked(true).unwrap();
        state.set_locked(true).unwrap();
        assert!(state.is_locked());
    }
}
