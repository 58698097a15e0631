//! Notifications emitted by devices and the push events they fan out as.

use serde::Serialize;

use crate::device::DeviceName;
use crate::identity::CallerIdentity;

/// What happened to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// An actuation pulse completed.
    Opened,
    /// The lock flag was written (possibly to its current value).
    LockChanged { locked: bool },
}

/// A notification emitted by a device after a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceNotification {
    pub device: DeviceName,
    pub caller: CallerIdentity,
    #[serde(flatten)]
    pub kind: NotificationKind,
}

impl DeviceNotification {
    #[must_use]
    pub fn opened(device: DeviceName, caller: CallerIdentity) -> Self {
        Self {
            device,
            caller,
            kind: NotificationKind::Opened,
        }
    }

    #[must_use]
    pub fn lock_changed(device: DeviceName, caller: CallerIdentity, locked: bool) -> Self {
        Self {
            device,
            caller,
            kind: NotificationKind::LockChanged { locked },
        }
    }
}

/// A named event delivered to push-channel subscribers.
///
/// `payload` is already serialized: plain text for [`MESSAGE_TOPIC`]
/// events, a JSON boolean for `<device>_status` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub topic: String,
    pub payload: String,
}

/// Topic carrying human-readable actuation notices.
pub const MESSAGE_TOPIC: &str = "message";

impl PushEvent {
    /// `"<device> opened"` on the [`MESSAGE_TOPIC`].
    #[must_use]
    pub fn opened(device: &DeviceName) -> Self {
        Self {
            topic: MESSAGE_TOPIC.to_string(),
            payload: format!("{device} opened"),
        }
    }

    /// The lock flag of `device` as a JSON boolean on `<device>_status`.
    #[must_use]
    pub fn lock_status(device: &DeviceName, locked: bool) -> Self {
        Self {
            topic: status_topic(device),
            payload: locked.to_string(),
        }
    }
}

impl From<&DeviceNotification> for PushEvent {
    fn from(notification: &DeviceNotification) -> Self {
        match notification.kind {
            NotificationKind::Opened => Self::opened(&notification.device),
            NotificationKind::LockChanged { locked } => {
                Self::lock_status(&notification.device, locked)
            }
        }
    }
}

/// Topic name for the lock status of `device`.
#[must_use]
pub fn status_topic(device: &DeviceName) -> String {
    format!("{device}_status")
}
