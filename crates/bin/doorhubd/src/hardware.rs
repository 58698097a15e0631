//! Hardware wiring — opens the configured lines and builds devices and
//! monitors on top of them.

use std::sync::Arc;

use doorhub_adapter_gpio_sysfs::{SysfsGpio, SysfsInput, SysfsRelay};
use doorhub_adapter_virtual::{InputHandle, VirtualInput, VirtualRelay};
use doorhub_app::actuator::ActuatorDevice;
use doorhub_app::monitor::InputMonitor;
use doorhub_app::ports::{Edge, RelayOutput, SenseInput};
use doorhub_app::registry::DeviceRegistry;
use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;

use crate::config::{Config, GpioBackend};

/// A relay line from whichever backend is configured.
#[derive(Debug)]
pub enum Relay {
    Sysfs(SysfsRelay),
    Virtual(Arc<VirtualRelay>),
}

impl RelayOutput for Relay {
    async fn set_active(&self, active: bool) -> Result<(), DoorhubError> {
        match self {
            Self::Sysfs(relay) => relay.set_active(active).await,
            Self::Virtual(relay) => relay.set_active(active).await,
        }
    }
}

/// A sense line from whichever backend is configured.
#[derive(Debug)]
pub enum Sense {
    Sysfs(SysfsInput),
    Virtual(VirtualInput),
}

impl SenseInput for Sense {
    async fn next_edge(&mut self) -> Result<Option<Edge>, DoorhubError> {
        match self {
            Self::Sysfs(input) => input.next_edge().await,
            Self::Virtual(input) => input.next_edge().await,
        }
    }
}

/// A monitor that opens a device.
pub type DeviceMonitor = InputMonitor<Sense, Arc<ActuatorDevice<Relay>>>;

/// Everything built from the `devices` and `monitors` sections.
pub struct Wiring {
    pub registry: Arc<DeviceRegistry<Relay>>,
    pub monitors: Vec<DeviceMonitor>,
    /// Handles of virtual inputs; a virtual line closes once its handle is
    /// dropped, so these live as long as the daemon.
    pub virtual_inputs: Vec<InputHandle>,
}

enum Lines {
    Sysfs(SysfsGpio),
    Virtual,
}

impl Lines {
    async fn relay(&self, pin: Pin) -> Result<Relay, DoorhubError> {
        match self {
            Self::Sysfs(gpio) => Ok(Relay::Sysfs(gpio.relay(pin).await?)),
            Self::Virtual => Ok(Relay::Virtual(Arc::new(VirtualRelay::new(pin)))),
        }
    }

    async fn input(&self, pin: Pin) -> Result<(Sense, Option<InputHandle>), DoorhubError> {
        match self {
            Self::Sysfs(gpio) => Ok((Sense::Sysfs(gpio.input(pin).await?), None)),
            Self::Virtual => {
                let (input, handle) = VirtualInput::new(pin);
                Ok((Sense::Virtual(input), Some(handle)))
            }
        }
    }
}

/// Open every configured line and build the registry and monitors.
///
/// # Errors
///
/// Returns [`DoorhubError::Hardware`] when a line cannot be opened, and a
/// validation or not-found error when devices and monitors do not match.
pub async fn wire(config: &Config) -> Result<Wiring, DoorhubError> {
    let lines = match config.gpio.backend {
        GpioBackend::Sysfs => Lines::Sysfs(SysfsGpio::new(&config.gpio.sysfs)),
        GpioBackend::Virtual => {
            tracing::warn!("using virtual GPIO lines, nothing will be actuated");
            Lines::Virtual
        }
    };

    let mut registry = DeviceRegistry::new();
    for device in &config.devices.0 {
        let relay = lines.relay(device.pin).await?;
        registry.register(Arc::new(
            ActuatorDevice::new(device.name.clone(), device.pin, relay)
                .with_pulse(config.gpio.pulse()),
        ))?;
        tracing::info!(device = %device.name, pin = %device.pin, "device ready");
    }

    let mut monitors = Vec::with_capacity(config.monitors.0.len());
    let mut virtual_inputs = Vec::new();
    for monitor in &config.monitors.0 {
        let device = Arc::clone(registry.get(monitor.device.as_str())?);
        let (input, handle) = lines.input(monitor.pin).await?;
        virtual_inputs.extend(handle);
        monitors.push(
            InputMonitor::new(monitor.name.clone(), monitor.pin, input, device)
                .with_debounce(monitor.debounce()),
        );
    }

    Ok(Wiring {
        registry: Arc::new(registry),
        monitors,
        virtual_inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn virtual_config() -> Config {
        let mut config = Config::default();
        config.gpio.backend = GpioBackend::Virtual;
        config.gpio.pulse_ms = 5;
        config
    }

    #[tokio::test]
    async fn should_wire_stock_devices_and_monitor() {
        let wiring = wire(&virtual_config()).await.unwrap();

        let names: Vec<_> = wiring
            .registry
            .iter()
            .map(|device| device.name().to_string())
            .collect();
        assert_eq!(names, vec!["door", "gate"]);
        assert_eq!(wiring.monitors.len(), 1);
        assert_eq!(wiring.virtual_inputs.len(), 1);
        assert_eq!(
            wiring.registry.get("door").unwrap().pulse(),
            Duration::from_millis(5)
        );
    }

    #[tokio::test]
    async fn should_open_door_when_virtual_button_is_pressed() {
        let mut wiring = wire(&virtual_config()).await.unwrap();
        let door = Arc::clone(wiring.registry.get("door").unwrap());
        for monitor in wiring.monitors.drain(..) {
            monitor.spawn();
        }

        assert!(wiring.virtual_inputs[0].press());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let Relay::Virtual(relay) = door.relay() else {
            panic!("expected a virtual relay");
        };
        assert_eq!(relay.levels(), vec![true, false]);
    }

    #[tokio::test]
    async fn should_fail_when_sysfs_root_is_missing() {
        let mut config = Config::default();
        config.gpio.sysfs.sysfs_root = std::env::temp_dir().join("doorhub-no-such-gpio-class");

        let result = wire(&config).await;

        assert!(matches!(result, Err(DoorhubError::Hardware(_))));
    }
}
