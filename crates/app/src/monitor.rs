//! Input monitor — debounces a sense line and fires an action on rising edges.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;
use doorhub_domain::identity::CallerIdentity;

use crate::actuator::ActuatorDevice;
use crate::ports::{Edge, RelayOutput, SenseInput};

/// Refractory window applied to a sense line.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Refractory-window edge filter.
///
/// An edge is accepted only when no edge was accepted during the `window`
/// preceding it. Discarded edges do not extend the window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Decide whether an edge observed at `at` is genuine.
    pub fn accept(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted
            && at.saturating_duration_since(last) < self.window
        {
            return false;
        }
        self.last_accepted = Some(at);
        true
    }
}

/// The action an [`InputMonitor`] fires on an accepted rising edge.
pub trait Trigger: Send + Sync + 'static {
    fn trigger(&self) -> impl Future<Output = Result<(), DoorhubError>> + Send;
}

/// A physical trigger opens the device anonymously.
impl<R: RelayOutput + 'static> Trigger for Arc<ActuatorDevice<R>> {
    fn trigger(&self) -> impl Future<Output = Result<(), DoorhubError>> + Send {
        let device = Arc::clone(self);
        async move { device.open(CallerIdentity::anonymous()).await }
    }
}

/// Watches one sense line and fires an action on debounced rising edges.
pub struct InputMonitor<I, A> {
    name: String,
    pin: Pin,
    input: I,
    action: A,
    debouncer: Debouncer,
}

impl<I, A> InputMonitor<I, A>
where
    I: SenseInput + 'static,
    A: Trigger + Clone,
{
    pub fn new(name: impl Into<String>, pin: Pin, input: I, action: A) -> Self {
        Self {
            name: name.into(),
            pin,
            input,
            action,
            debouncer: Debouncer::new(DEFAULT_DEBOUNCE),
        }
    }

    /// Override the debounce window.
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debouncer = Debouncer::new(window);
        self
    }

    /// Run the monitor on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consume edges until the input closes or fails.
    ///
    /// Each accepted rising edge fires the action on its own task; the
    /// action's failures are logged and never stop the monitor.
    pub async fn run(mut self) {
        tracing::info!(monitor = %self.name, pin = %self.pin, "input monitor started");
        loop {
            let edge = match self.input.next_edge().await {
                Ok(Some(edge)) => edge,
                Ok(None) => {
                    tracing::info!(monitor = %self.name, "input closed");
                    break;
                }
                Err(err) => {
                    tracing::error!(monitor = %self.name, pin = %self.pin, error = %err, "input fault");
                    break;
                }
            };

            if !self.debouncer.accept(Instant::now()) {
                tracing::trace!(monitor = %self.name, ?edge, "edge discarded as noise");
                continue;
            }
            if edge != Edge::Rising {
                continue;
            }

            tracing::debug!(monitor = %self.name, "rising edge accepted");
            let action = self.action.clone();
            let name = self.name.clone();
            tokio::spawn(async move {
                if let Err(err) = action.trigger().await {
                    tracing::warn!(monitor = %name, error = %err, "triggered action failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use doorhub_domain::error::DeviceError;

    /// Replays edges, each after a delay since the previous one.
    struct ScriptedInput {
        script: VecDeque<(Duration, Edge)>,
    }

    impl ScriptedInput {
        fn new(script: &[(u64, Edge)]) -> Self {
            Self {
                script: script
                    .iter()
                    .map(|(ms, edge)| (Duration::from_millis(*ms), *edge))
                    .collect(),
            }
        }
    }

    impl SenseInput for ScriptedInput {
        async fn next_edge(&mut self) -> Result<Option<Edge>, DoorhubError> {
            let Some((delay, edge)) = self.script.pop_front() else {
                return Ok(None);
            };
            tokio::time::sleep(delay).await;
            Ok(Some(edge))
        }
    }

    struct FailingInput;

    impl SenseInput for FailingInput {
        async fn next_edge(&mut self) -> Result<Option<Edge>, DoorhubError> {
            Err(DoorhubError::hardware(std::io::Error::other("line gone")))
        }
    }

    #[derive(Clone, Default)]
    struct CountingTrigger {
        calls: Arc<AtomicUsize>,
        refuse: bool,
    }

    impl Trigger for CountingTrigger {
        async fn trigger(&self) -> Result<(), DoorhubError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(DeviceError::Locked.into());
            }
            Ok(())
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_accept_first_edge() {
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        assert!(debouncer.accept(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn should_discard_edges_inside_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        let start = Instant::now();
        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_millis(50)));
        assert!(!debouncer.accept(start + Duration::from_millis(199)));
        assert!(debouncer.accept(start + Duration::from_millis(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_extend_window_with_discarded_edges() {
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        let start = Instant::now();
        debouncer.accept(start);
        debouncer.accept(start + Duration::from_millis(150));
        assert!(debouncer.accept(start + Duration::from_millis(250)));
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_once_for_a_bouncing_press() {
        let trigger = CountingTrigger::default();
        let input = ScriptedInput::new(&[
            (0, Edge::Rising),
            (5, Edge::Falling),
            (5, Edge::Rising),
            (10, Edge::Falling),
        ]);

        InputMonitor::new("button", Pin(26), input, trigger.clone())
            .with_debounce(Duration::from_millis(200))
            .run()
            .await;
        settle().await;

        assert_eq!(trigger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_again_after_quiet_interval() {
        let trigger = CountingTrigger::default();
        let input = ScriptedInput::new(&[
            (0, Edge::Rising),
            (300, Edge::Falling),
            (300, Edge::Rising),
        ]);

        InputMonitor::new("button", Pin(26), input, trigger.clone())
            .with_debounce(Duration::from_millis(200))
            .run()
            .await;
        settle().await;

        assert_eq!(trigger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_falling_edges() {
        let trigger = CountingTrigger::default();
        let input = ScriptedInput::new(&[(0, Edge::Falling), (500, Edge::Falling)]);

        InputMonitor::new("button", Pin(26), input, trigger.clone())
            .run()
            .await;
        settle().await;

        assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_running_when_action_fails() {
        let trigger = CountingTrigger {
            refuse: true,
            ..CountingTrigger::default()
        };
        let input = ScriptedInput::new(&[(0, Edge::Rising), (500, Edge::Rising)]);

        InputMonitor::new("button", Pin(26), input, trigger.clone())
            .run()
            .await;
        settle().await;

        assert_eq!(trigger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_on_input_fault() {
        let trigger = CountingTrigger::default();

        let handle = InputMonitor::new("button", Pin(26), FailingInput, trigger.clone()).spawn();

        handle.await.unwrap();
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
    }
}
