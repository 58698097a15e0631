//! Device registry — name → device lookup, built once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use doorhub_domain::device::DeviceName;
use doorhub_domain::error::{NotFoundError, ValidationError};

use crate::actuator::ActuatorDevice;

/// Maps device names to devices.
///
/// Populated during startup and shared read-only afterwards; the registry
/// owns no device lifecycle beyond holding a reference.
pub struct DeviceRegistry<R> {
    devices: BTreeMap<DeviceName, Arc<ActuatorDevice<R>>>,
}

impl<R> Default for DeviceRegistry<R> {
    fn default() -> Self {
        Self {
            devices: BTreeMap::new(),
        }
    }
}

impl<R> DeviceRegistry<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateName`] when a device with the
    /// same name is already registered.
    pub fn register(&mut self, device: Arc<ActuatorDevice<R>>) -> Result<(), ValidationError> {
        let name = device.name().clone();
        if self.devices.contains_key(&name) {
            return Err(ValidationError::DuplicateName(name.into()));
        }
        self.devices.insert(name, device);
        Ok(())
    }

    /// Resolve a device by name.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when no device has that name.
    pub fn get(&self, name: &str) -> Result<&Arc<ActuatorDevice<R>>, NotFoundError> {
        self.devices.get(name).ok_or_else(|| NotFoundError {
            entity: "Device",
            name: name.to_string(),
        })
    }

    /// Devices in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActuatorDevice<R>>> {
        self.devices.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
