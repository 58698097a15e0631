//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `doorhub.toml` in the working directory, or the file named by
//! `DOORHUB_CONFIG`. Every field has a default matching the stock
//! installation so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use doorhub_adapter_gpio_sysfs::GpioConfig;
use doorhub_app::actuator::DEFAULT_PULSE;
use doorhub_app::broadcaster::DEFAULT_CAPACITY;
use doorhub_app::monitor::DEFAULT_DEBOUNCE;
use doorhub_domain::device::{DeviceName, Pin};

const DEFAULT_PATH: &str = "doorhub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Certificates for HTTPS with client authentication.
    pub tls: TlsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Origin allow-list and anonymous access.
    pub security: SecurityConfig,
    /// GPIO backend and line settings.
    pub gpio: GpioSection,
    /// Relay-driven devices.
    pub devices: DeviceList,
    /// Sense inputs and the device each one opens.
    pub monitors: MonitorList,
    /// Push channel settings.
    pub events: EventsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Directory of static assets served for non-API paths.
    pub static_dir: Option<PathBuf>,
}

/// PEM files for the TLS listener. All three or none.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Server certificate chain.
    pub cert: Option<PathBuf>,
    /// Server private key.
    pub key: Option<PathBuf>,
    /// CA that signs client certificates.
    pub ca: Option<PathBuf>,
}

/// A complete set of TLS files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub ca: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Who may call the API.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Exact origins (`scheme://host[:port]`) allowed to call the API.
    pub allowed_origins: Vec<String>,
    /// Let callers without a client certificate change device state.
    pub allow_anonymous: bool,
}

/// Which GPIO implementation drives the lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    /// Linux sysfs GPIO class.
    #[default]
    Sysfs,
    /// In-memory lines, for hosts without GPIO.
    Virtual,
}

/// GPIO configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GpioSection {
    pub backend: GpioBackend,
    /// How long a relay stays energised per open, in milliseconds.
    pub pulse_ms: u64,
    #[serde(flatten)]
    pub sysfs: GpioConfig,
}

/// One relay-driven device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: DeviceName,
    pub pin: Pin,
}

/// One sense input.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub name: String,
    pub pin: Pin,
    /// Device opened on a rising edge.
    pub device: DeviceName,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Configured devices; defaults to the door and gate relays.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct DeviceList(pub Vec<DeviceConfig>);

/// Configured monitors; defaults to the door button.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct MonitorList(pub Vec<MonitorConfig>);

/// Push channel configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events buffered per subscriber before it is considered lagging.
    pub capacity: usize,
}

impl Config {
    /// Load configuration from `doorhub.toml` (or `DOORHUB_CONFIG`) if
    /// present, then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, if `DOORHUB_CONFIG` names
    /// a missing file, or if the result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("DOORHUB_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path), true)?,
            Err(_) => Self::from_file(Path::new(DEFAULT_PATH), false)?,
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("DOORHUB_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("DOORHUB_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("DOORHUB_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("DOORHUB_GPIO_BACKEND") {
            self.gpio.backend = match val.as_str() {
                "sysfs" => GpioBackend::Sysfs,
                "virtual" => GpioBackend::Virtual,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "DOORHUB_GPIO_BACKEND must be sysfs or virtual, got {other:?}"
                    )));
                }
            };
        }
        if let Some(val) = var("DOORHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.security.allowed_origins.is_empty() {
            return Err(ConfigError::Validation(
                "security.allowed_origins must not be empty".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Validation(
                "events.capacity must be non-zero".to_string(),
            ));
        }

        let mut names = BTreeSet::new();
        for device in &self.devices.0 {
            if !names.insert(&device.name) {
                return Err(ConfigError::Validation(format!(
                    "device {:?} is configured twice",
                    device.name.as_str()
                )));
            }
        }
        for monitor in &self.monitors.0 {
            if !names.contains(&monitor.device) {
                return Err(ConfigError::Validation(format!(
                    "monitor {:?} opens unknown device {:?}",
                    monitor.name,
                    monitor.device.as_str()
                )));
            }
        }

        self.tls.paths().map(|_| ())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl TlsConfig {
    /// The TLS files, if HTTPS is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when only some of the three files
    /// are set.
    pub fn paths(&self) -> Result<Option<TlsPaths>, ConfigError> {
        match (&self.cert, &self.key, &self.ca) {
            (Some(cert), Some(key), Some(ca)) => Ok(Some(TlsPaths {
                cert: cert.clone(),
                key: key.clone(),
                ca: ca.clone(),
            })),
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::Validation(
                "tls.cert, tls.key and tls.ca must be set together".to_string(),
            )),
        }
    }
}

impl GpioSection {
    #[must_use]
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 443,
            static_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "doorhubd=info,doorhub=info,tower_http=info".to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://192.168.1.254".to_string(),
                "https://raspberrypi.home".to_string(),
                "https://raspberrypi".to_string(),
            ],
            allow_anonymous: true,
        }
    }
}

impl Default for GpioSection {
    fn default() -> Self {
        Self {
            backend: GpioBackend::default(),
            pulse_ms: millis(DEFAULT_PULSE),
            sysfs: GpioConfig::default(),
        }
    }
}

impl Default for DeviceList {
    fn default() -> Self {
        Self(
            [("door", 12), ("gate", 22)]
                .into_iter()
                .filter_map(|(name, pin)| {
                    Some(DeviceConfig {
                        name: DeviceName::new(name).ok()?,
                        pin: Pin(pin),
                    })
                })
                .collect(),
        )
    }
}

impl Default for MonitorList {
    fn default() -> Self {
        Self(
            DeviceName::new("door")
                .map(|device| MonitorConfig {
                    name: "gpio input".to_string(),
                    pin: Pin(26),
                    device,
                    debounce_ms: default_debounce_ms(),
                })
                .into_iter()
                .collect(),
        )
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

fn default_debounce_ms() -> u64 {
    millis(DEFAULT_DEBOUNCE)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
