//! In-process event fan-out backed by a tokio broadcast channel.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use doorhub_domain::error::ValidationError;
use doorhub_domain::event::{DeviceNotification, PushEvent};

use crate::ports::NotificationSink;
use crate::registry::DeviceRegistry;

/// Per-subscriber queue length used when none is configured.
pub const DEFAULT_CAPACITY: usize = 64;

/// Fans device notifications out to every connected subscriber.
///
/// Each subscriber reads from its own bounded queue, so a slow reader only
/// ever loses its own events. Publishing succeeds even when there are no
/// subscribers (the event is simply dropped).
pub struct EventBroadcaster<R> {
    channel: Arc<Channel>,
    registry: Arc<DeviceRegistry<R>>,
}

impl<R> EventBroadcaster<R> {
    /// Create a broadcaster over `registry` with the given per-subscriber
    /// queue capacity.
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry<R>>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            channel: Arc::new(Channel { sender }),
            registry,
        }
    }

    /// Register this broadcaster as a notification sink on every device.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooManySinks`] if a device cannot accept
    /// another sink.
    pub fn attach(&self) -> Result<(), ValidationError> {
        for device in self.registry.iter() {
            device.register_sink(Arc::clone(&self.channel) as Arc<dyn NotificationSink>)?;
        }
        Ok(())
    }

    /// Deliver `event` to every current subscriber, in call order.
    ///
    /// Returns how many subscribers the event was queued for.
    pub fn publish(&self, event: PushEvent) -> usize {
        self.channel.publish(event)
    }

    /// Open a subscription.
    ///
    /// The subscription first yields one status event per registered device,
    /// then every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<R> {
        let (pending, live) = self.channel.open(&self.registry);
        Subscription {
            pending,
            live,
            channel: Arc::clone(&self.channel),
            registry: Arc::clone(&self.registry),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.channel.sender.receiver_count()
    }
}

/// The sending half, shared by the broadcaster, the device sinks and every
/// subscription.
struct Channel {
    sender: broadcast::Sender<PushEvent>,
}

impl Channel {
    fn publish(&self, event: PushEvent) -> usize {
        // send fails only when there are zero receivers.
        self.sender.send(event).unwrap_or(0)
    }

    /// A fresh receiver and the status snapshot it starts from.
    fn open<R>(
        &self,
        registry: &DeviceRegistry<R>,
    ) -> (VecDeque<PushEvent>, BroadcastStream<PushEvent>) {
        // Subscribe before reading the snapshot so no change can fall
        // between the two.
        let live = BroadcastStream::new(self.sender.subscribe());
        (snapshot(registry), live)
    }
}

impl NotificationSink for Channel {
    fn notify(&self, notification: &DeviceNotification) {
        self.publish(PushEvent::from(notification));
    }
}

/// One `<device>_status` event per registered device.
fn snapshot<R>(registry: &DeviceRegistry<R>) -> VecDeque<PushEvent> {
    registry
        .iter()
        .map(|device| PushEvent::lock_status(device.name(), device.is_locked()))
        .collect()
}

/// A live subscription to the broadcaster.
///
/// Dropping it unsubscribes. If the subscriber falls behind and its queue
/// overflows, everything still queued is discarded and a fresh status
/// snapshot is replayed, so the subscriber never sees a state older than
/// one it was already shown.
pub struct Subscription<R> {
    pending: VecDeque<PushEvent>,
    live: BroadcastStream<PushEvent>,
    channel: Arc<Channel>,
    registry: Arc<DeviceRegistry<R>>,
}

impl<R> Stream for Subscription<R> {
    type Item = PushEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PushEvent>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }
            match Pin::new(&mut this.live).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(skipped, "subscriber lagged, replaying status snapshot");
                    (this.pending, this.live) = this.channel.open(&this.registry);
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorDevice;
    use doorhub_domain::device::{DeviceName, Pin as LinePin};
    use doorhub_domain::identity::CallerIdentity;
    use tokio_stream::StreamExt;

    type Registry = DeviceRegistry<()>;

    fn registry(names: &[&str]) -> Arc<Registry> {
        let mut registry = DeviceRegistry::new();
        for (pin, name) in (0u32..).zip(names) {
            registry
                .register(Arc::new(ActuatorDevice::new(
                    DeviceName::new(*name).unwrap(),
                    LinePin(pin),
                    (),
                )))
                .unwrap();
        }
        Arc::new(registry)
    }

    fn attached(names: &[&str]) -> (Arc<Registry>, EventBroadcaster<()>) {
        let registry = registry(names);
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry), 16);
        broadcaster.attach().unwrap();
        (registry, broadcaster)
    }

    fn event(topic: &str, payload: &str) -> PushEvent {
        PushEvent {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn should_replay_one_status_per_device_before_live_events() {
        let (registry, broadcaster) = attached(&["door", "gate"]);
        registry
            .get("gate")
            .unwrap()
            .set_locked(CallerIdentity::anonymous(), true)
            .unwrap();

        let mut sub = broadcaster.subscribe();
        broadcaster.publish(event("message", "door opened"));

        assert_eq!(sub.next().await, Some(event("door_status", "false")));
        assert_eq!(sub.next().await, Some(event("gate_status", "true")));
        assert_eq!(sub.next().await, Some(event("message", "door opened")));
    }

    #[tokio::test]
    async fn should_forward_device_notifications() {
        let (registry, broadcaster) = attached(&["door"]);
        let mut sub = broadcaster.subscribe();
        assert_eq!(sub.next().await, Some(event("door_status", "false")));

        registry
            .get("door")
            .unwrap()
            .set_locked(CallerIdentity::named("alice"), true)
            .unwrap();

        assert_eq!(sub.next().await, Some(event("door_status", "true")));
    }

    #[tokio::test]
    async fn should_deliver_to_every_subscriber() {
        let (_registry, broadcaster) = attached(&[]);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        let delivered = broadcaster.publish(event("message", "gate opened"));

        assert_eq!(delivered, 2);
        assert_eq!(first.next().await, Some(event("message", "gate opened")));
        assert_eq!(second.next().await, Some(event("message", "gate opened")));
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let (_registry, broadcaster) = attached(&["door"]);
        assert_eq!(broadcaster.publish(event("message", "door opened")), 0);
    }

    #[tokio::test]
    async fn should_unsubscribe_when_dropped() {
        let (_registry, broadcaster) = attached(&["door"]);
        let sub = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(sub);

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn should_not_block_others_when_one_subscriber_lags() {
        let registry = registry(&["door"]);
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry), 2);
        broadcaster.attach().unwrap();
        let mut slow = broadcaster.subscribe();
        let mut fast = broadcaster.subscribe();
        assert_eq!(fast.next().await, Some(event("door_status", "false")));

        for n in 0..5 {
            broadcaster.publish(event("message", &n.to_string()));
            assert_eq!(fast.next().await, Some(event("message", &n.to_string())));
        }

        // snapshot queued at subscribe time, then the overflow replays it
        assert_eq!(slow.next().await, Some(event("door_status", "false")));
        assert_eq!(slow.next().await, Some(event("door_status", "false")));

        broadcaster.publish(event("message", "5"));
        assert_eq!(slow.next().await, Some(event("message", "5")));
    }

    #[tokio::test]
    async fn should_never_replay_stale_status_after_lag() {
        let registry = registry(&["door"]);
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry), 2);
        broadcaster.attach().unwrap();
        let mut slow = broadcaster.subscribe();
        assert_eq!(slow.next().await, Some(event("door_status", "false")));

        let door = registry.get("door").unwrap();
        for locked in [true, false, true] {
            door.set_locked(CallerIdentity::anonymous(), locked).unwrap();
        }

        assert_eq!(slow.next().await, Some(event("door_status", "true")));

        door.set_locked(CallerIdentity::anonymous(), false).unwrap();
        assert_eq!(slow.next().await, Some(event("door_status", "false")));
    }

    #[tokio::test]
    async fn should_preserve_per_device_order_under_interleaving() {
        let (registry, broadcaster) = attached(&["door", "gate"]);
        let mut sub = broadcaster.subscribe();
        sub.next().await;
        sub.next().await;

        let door = Arc::clone(registry.get("door").unwrap());
        let gate = Arc::clone(registry.get("gate").unwrap());
        let door_task = tokio::spawn(async move {
            for n in 0..6 {
                door.set_locked(CallerIdentity::anonymous(), n % 2 == 0).unwrap();
                tokio::task::yield_now().await;
            }
        });
        let gate_task = tokio::spawn(async move {
            for n in 0..6 {
                gate.set_locked(CallerIdentity::anonymous(), n % 3 == 0).unwrap();
                tokio::task::yield_now().await;
            }
        });
        door_task.await.unwrap();
        gate_task.await.unwrap();

        let mut door_seen = Vec::new();
        let mut gate_seen = Vec::new();
        for _ in 0..12 {
            let e = sub.next().await.unwrap();
            match e.topic.as_str() {
                "door_status" => door_seen.push(e.payload),
                "gate_status" => gate_seen.push(e.payload),
                other => panic!("unexpected topic {other}"),
            }
        }
        let expect = |f: fn(i32) -> bool| (0..6).map(|n| f(n).to_string()).collect::<Vec<_>>();
        assert_eq!(door_seen, expect(|n| n % 2 == 0));
        assert_eq!(gate_seen, expect(|n| n % 3 == 0));
    }
}
