//! # doorhub-app
//!
//! Application layer — device use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that hardware adapters implement:
//!   - `RelayOutput` — drive a relay line
//!   - `SenseInput` — report edges on a digital sense line
//!   - `NotificationSink` — observe device notifications
//! - Provide the **actuator** (`ActuatorDevice`) that serializes physical
//!   actuation and owns the lock flag
//! - Provide the **input monitor** (`InputMonitor`) that debounces a sense
//!   line and triggers an action
//! - Provide the **device registry** and the in-process **event
//!   broadcaster** that fans notifications out to subscribers
//!
//! ## Dependency rule
//! Depends on `doorhub-domain` only (plus `tokio` for tasks, timers and
//! channels). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod actuator;
pub mod broadcaster;
pub mod monitor;
pub mod ports;
pub mod registry;
