//! Hardware ports — relay outputs and digital sense inputs.

use std::future::Future;

use doorhub_domain::error::DoorhubError;

/// A level transition observed on a sense line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// A relay output line.
///
/// `active` means the relay is energised and the actuator is driven,
/// independently of the electrical polarity of the line.
pub trait RelayOutput: Send + Sync {
    /// Energise (`true`) or release (`false`) the relay.
    fn set_active(&self, active: bool) -> impl Future<Output = Result<(), DoorhubError>> + Send;
}

impl<T: RelayOutput> RelayOutput for std::sync::Arc<T> {
    fn set_active(&self, active: bool) -> impl Future<Output = Result<(), DoorhubError>> + Send {
        (**self).set_active(active)
    }
}

/// A digital sense line.
pub trait SenseInput: Send {
    /// Wait for the next edge.
    ///
    /// Returns `Ok(None)` once the line is closed and will not report
    /// further edges.
    fn next_edge(&mut self) -> impl Future<Output = Result<Option<Edge>, DoorhubError>> + Send;
}
