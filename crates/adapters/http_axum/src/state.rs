//! Shared application state for axum handlers.

use std::sync::Arc;

use doorhub_app::broadcaster::EventBroadcaster;
use doorhub_app::registry::DeviceRegistry;

use crate::auth::AccessPolicy;

/// Application state shared across all axum handlers.
///
/// Generic over the relay type to avoid dynamic dispatch. `Clone` is
/// implemented manually so the relay type itself does not need to be
/// `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<R> {
    /// Name → device lookup.
    pub registry: Arc<DeviceRegistry<R>>,
    /// Fan-out of device notifications to push subscribers.
    pub broadcaster: Arc<EventBroadcaster<R>>,
    /// Origin allow-list and anonymous-access policy.
    pub policy: Arc<AccessPolicy>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            broadcaster: Arc::clone(&self.broadcaster),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<R> AppState<R> {
    /// Create a new application state from its parts.
    pub fn new(
        registry: Arc<DeviceRegistry<R>>,
        broadcaster: Arc<EventBroadcaster<R>>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            policy: Arc::new(policy),
        }
    }
}
