//! Notification port — observers of device transitions.

use doorhub_domain::event::DeviceNotification;

/// Receives every notification a device emits.
///
/// Called synchronously while the device holds its state guard, so
/// implementations must not block and must not call back into the device.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &DeviceNotification);
}
