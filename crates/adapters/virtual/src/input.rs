//! Virtual sense input — edges are pushed in through a handle.

use tokio::sync::mpsc;

use doorhub_app::ports::{Edge, SenseInput};
use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;

/// A simulated sense line.
///
/// The line closes once every [`InputHandle`] is dropped.
#[derive(Debug)]
pub struct VirtualInput {
    pin: Pin,
    edges: mpsc::UnboundedReceiver<Edge>,
}

/// Drives a [`VirtualInput`].
#[derive(Debug, Clone)]
pub struct InputHandle {
    pin: Pin,
    edges: mpsc::UnboundedSender<Edge>,
}

impl VirtualInput {
    /// Create a sense line on `pin` and the handle that drives it.
    #[must_use]
    pub fn new(pin: Pin) -> (Self, InputHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                pin,
                edges: receiver,
            },
            InputHandle {
                pin,
                edges: sender,
            },
        )
    }

    #[must_use]
    pub fn pin(&self) -> Pin {
        self.pin
    }
}

impl InputHandle {
    /// Report one edge. Returns `false` if the input was dropped.
    pub fn edge(&self, edge: Edge) -> bool {
        tracing::debug!(pin = %self.pin, ?edge, "virtual edge");
        self.edges.send(edge).is_ok()
    }

    /// A clean press: one rising edge followed by one falling edge.
    pub fn press(&self) -> bool {
        self.edge(Edge::Rising) && self.edge(Edge::Falling)
    }
}

impl SenseInput for VirtualInput {
    async fn next_edge(&mut self) -> Result<Option<Edge>, DoorhubError> {
        Ok(self.edges.recv().await)
    }
}
