//! Actuator device — serializes relay pulses and owns the lock flag.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use doorhub_domain::device::{DeviceName, DeviceState, Pin};
use doorhub_domain::error::{DoorhubError, ValidationError};
use doorhub_domain::event::DeviceNotification;
use doorhub_domain::identity::CallerIdentity;

use crate::ports::{NotificationSink, RelayOutput};

/// Maximum number of notification sinks a device accepts.
pub const MAX_SINKS: usize = 8;

/// How long the relay stays energised for one `open`.
pub const DEFAULT_PULSE: Duration = Duration::from_millis(1000);

/// A relay-driven actuator (door strike, gate motor) with a lock flag.
///
/// All transitions go through one state guard: at most one pulse is in
/// flight, `open` is refused while locked, and the lock flag cannot change
/// during a pulse. Notifications are emitted while the guard is held, so
/// sinks observe them in transition order.
pub struct ActuatorDevice<R> {
    name: DeviceName,
    pin: Pin,
    relay: R,
    pulse: Duration,
    state: Mutex<DeviceState>,
    sinks: RwLock<Vec<Arc<dyn NotificationSink>>>,
}

impl<R> ActuatorDevice<R> {
    /// Create an idle, unlocked device driving `relay`.
    pub fn new(name: DeviceName, pin: Pin, relay: R) -> Self {
        Self {
            name,
            pin,
            relay,
            pulse: DEFAULT_PULSE,
            state: Mutex::new(DeviceState::default()),
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Override the pulse duration.
    #[must_use]
    pub fn with_pulse(mut self, pulse: Duration) -> Self {
        self.pulse = pulse;
        self
    }

    #[must_use]
    pub fn name(&self) -> &DeviceName {
        &self.name
    }

    #[must_use]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    #[must_use]
    pub fn pulse(&self) -> Duration {
        self.pulse
    }

    /// The output this device drives.
    #[must_use]
    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Current value of the lock flag.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_state().is_locked()
    }

    /// Whether a pulse is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock_state().is_busy()
    }

    /// Register an observer for this device's notifications.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TooManySinks`] once [`MAX_SINKS`] sinks
    /// are registered.
    pub fn register_sink(&self, sink: Arc<dyn NotificationSink>) -> Result<(), ValidationError> {
        let mut sinks = self
            .sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if sinks.len() >= MAX_SINKS {
            return Err(ValidationError::TooManySinks {
                device: self.name.to_string(),
                limit: MAX_SINKS,
            });
        }
        sinks.push(sink);
        Ok(())
    }

    /// Set the lock flag and notify sinks, even when the value is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DoorhubError::Device`] with `Busy` while a pulse is in
    /// flight. The flag is left untouched and nothing is emitted.
    pub fn set_locked(&self, caller: CallerIdentity, locked: bool) -> Result<(), DoorhubError> {
        let mut state = self.lock_state();
        if let Err(err) = state.set_locked(locked) {
            tracing::warn!(device = %self.name, %caller, locked, %err, "lock change refused");
            return Err(err.into());
        }
        tracing::info!(device = %self.name, %caller, locked, "lock flag set");
        self.emit(&DeviceNotification::lock_changed(
            self.name.clone(),
            caller,
            locked,
        ));
        Ok(())
    }

    fn emit(&self, notification: &DeviceNotification) {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter() {
            sink.notify(notification);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: RelayOutput + 'static> ActuatorDevice<R> {
    /// Pulse the relay and emit an `opened` notification.
    ///
    /// The pulse runs on its own task: dropping the returned future does
    /// not cut the pulse short, the relay is always released.
    ///
    /// # Errors
    ///
    /// - [`DoorhubError::Device`] with `Locked` when the lock flag is set
    ///   (no hardware action is taken)
    /// - [`DoorhubError::Device`] with `Busy` when a pulse is already in
    ///   flight
    /// - [`DoorhubError::Hardware`] when the relay could not be driven; the
    ///   device is back to idle and nothing is emitted
    pub async fn open(self: &Arc<Self>, caller: CallerIdentity) -> Result<(), DoorhubError> {
        if let Err(err) = self.lock_state().begin_open() {
            tracing::warn!(device = %self.name, %caller, %err, "open refused");
            return Err(err.into());
        }

        let device = Arc::clone(self);
        let pulse = tokio::spawn(async move { device.run_pulse(caller).await });
        match pulse.await {
            Ok(result) => result,
            Err(err) => {
                self.lock_state().finish_open();
                tracing::error!(device = %self.name, %err, "pulse task failed");
                Err(DoorhubError::hardware(err))
            }
        }
    }

    async fn run_pulse(&self, caller: CallerIdentity) -> Result<(), DoorhubError> {
        tracing::debug!(device = %self.name, pin = %self.pin, pulse = ?self.pulse, "energising relay");
        let energised = self.relay.set_active(true).await;
        if energised.is_ok() {
            tokio::time::sleep(self.pulse).await;
        }
        let released = self.relay.set_active(false).await;

        let mut state = self.lock_state();
        state.finish_open();
        match energised.and(released) {
            Ok(()) => {
                tracing::info!(device = %self.name, %caller, "device opened");
                self.emit(&DeviceNotification::opened(self.name.clone(), caller));
                Ok(())
            }
            Err(err) => {
                tracing::error!(device = %self.name, pin = %self.pin, error = %err, "relay fault");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorhub_domain::error::DeviceError;
    use doorhub_domain::event::NotificationKind;

    #[derive(Default)]
    struct RecordingRelay {
        levels: Mutex<Vec<bool>>,
        fail_on_energise: bool,
    }

    impl RecordingRelay {
        fn failing() -> Self {
            Self {
                levels: Mutex::new(Vec::new()),
                fail_on_energise: true,
            }
        }

        fn levels(&self) -> Vec<bool> {
            self.levels.lock().unwrap().clone()
        }
    }

    impl RelayOutput for RecordingRelay {
        async fn set_active(&self, active: bool) -> Result<(), DoorhubError> {
            self.levels.lock().unwrap().push(active);
            if active && self.fail_on_energise {
                return Err(DoorhubError::hardware(std::io::Error::other("relay stuck")));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<DeviceNotification>>,
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<NotificationKind> {
            self.seen.lock().unwrap().iter().map(|n| n.kind).collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, notification: &DeviceNotification) {
            self.seen.lock().unwrap().push(notification.clone());
        }
    }

    type TestDevice = Arc<ActuatorDevice<Arc<RecordingRelay>>>;

    fn device(relay: RecordingRelay) -> (TestDevice, Arc<RecordingRelay>, Arc<RecordingSink>) {
        let relay = Arc::new(relay);
        let device = Arc::new(
            ActuatorDevice::new(
                DeviceName::new("door").unwrap(),
                Pin(12),
                Arc::clone(&relay),
            )
            .with_pulse(Duration::from_millis(500)),
        );
        let sink = Arc::new(RecordingSink::default());
        device.register_sink(sink.clone()).unwrap();
        (device, relay, sink)
    }

    async fn wait_until_busy<R>(device: &ActuatorDevice<R>) {
        while !device.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_pulse_relay_and_emit_opened() {
        let (device, relay, sink) = device(RecordingRelay::default());

        device.open(CallerIdentity::named("alice")).await.unwrap();

        assert_eq!(relay.levels(), vec![true, false]);
        assert_eq!(sink.kinds(), vec![NotificationKind::Opened]);
        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen[0].caller, CallerIdentity::named("alice"));
        assert!(!device.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn should_hold_relay_for_the_pulse_duration() {
        let (device, _relay, _sink) = device(RecordingRelay::default());
        let started = tokio::time::Instant::now();

        device.open(CallerIdentity::anonymous()).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn should_refuse_open_when_locked_without_actuating() {
        let (device, relay, sink) = device(RecordingRelay::default());
        device.set_locked(CallerIdentity::anonymous(), true).unwrap();

        let result = device.open(CallerIdentity::named("alice")).await;

        assert!(matches!(
            result,
            Err(DoorhubError::Device(DeviceError::Locked))
        ));
        assert!(device.is_locked());
        assert!(relay.levels().is_empty());
        assert_eq!(
            sink.kinds(),
            vec![NotificationKind::LockChanged { locked: true }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_refuse_open_and_lock_while_pulse_in_flight() {
        let (device, relay, sink) = device(RecordingRelay::default());

        let first = tokio::spawn({
            let device = Arc::clone(&device);
            async move { device.open(CallerIdentity::anonymous()).await }
        });
        wait_until_busy(&device).await;

        let second = device.open(CallerIdentity::anonymous()).await;
        assert!(matches!(second, Err(DoorhubError::Device(DeviceError::Busy))));
        let lock = device.set_locked(CallerIdentity::anonymous(), true);
        assert!(matches!(lock, Err(DoorhubError::Device(DeviceError::Busy))));

        first.await.unwrap().unwrap();
        assert_eq!(relay.levels(), vec![true, false]);
        assert!(!device.is_locked());
        assert_eq!(sink.kinds(), vec![NotificationKind::Opened]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_finish_pulse_when_caller_is_dropped() {
        let (device, relay, sink) = device(RecordingRelay::default());

        let caller = tokio::spawn({
            let device = Arc::clone(&device);
            async move { device.open(CallerIdentity::anonymous()).await }
        });
        wait_until_busy(&device).await;
        caller.abort();

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(relay.levels(), vec![true, false]);
        assert!(!device.is_busy());
        assert_eq!(sink.kinds(), vec![NotificationKind::Opened]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_release_relay_and_return_idle_on_fault() {
        let (device, relay, sink) = device(RecordingRelay::failing());

        let result = device.open(CallerIdentity::anonymous()).await;

        assert!(matches!(result, Err(DoorhubError::Hardware(_))));
        assert_eq!(relay.levels(), vec![true, false]);
        assert!(!device.is_busy());
        assert!(sink.kinds().is_empty());
    }

    #[test]
    fn should_read_back_lock_value_after_set() {
        let (device, _relay, _sink) = device(RecordingRelay::default());
        for value in [true, false, true] {
            device.set_locked(CallerIdentity::anonymous(), value).unwrap();
            assert_eq!(device.is_locked(), value);
        }
    }

    #[test]
    fn should_emit_lock_changed_even_when_value_is_unchanged() {
        let (device, _relay, sink) = device(RecordingRelay::default());

        device.set_locked(CallerIdentity::anonymous(), false).unwrap();
        device.set_locked(CallerIdentity::anonymous(), false).unwrap();

        assert_eq!(
            sink.kinds(),
            vec![
                NotificationKind::LockChanged { locked: false },
                NotificationKind::LockChanged { locked: false },
            ]
        );
    }

    #[test]
    fn should_refuse_sinks_beyond_limit() {
        let (device, _relay, _sink) = device(RecordingRelay::default());
        for _ in 1..MAX_SINKS {
            device
                .register_sink(Arc::new(RecordingSink::default()))
                .unwrap();
        }

        let result = device.register_sink(Arc::new(RecordingSink::default()));

        assert!(matches!(
            result,
            Err(ValidationError::TooManySinks { limit: MAX_SINKS, .. })
        ));
    }
}
