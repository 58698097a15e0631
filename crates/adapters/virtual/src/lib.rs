//! # doorhub-adapter-virtual
//!
//! In-memory hardware for development hosts and tests.
//!
//! ## Provided lines
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`VirtualRelay`] | `RelayOutput` | Records every level it is driven to; can be told to fail |
//! | [`VirtualInput`] | `SenseInput` | Replays edges pushed through its [`InputHandle`] |
//!
//! ## Dependency rule
//!
//! Depends on `doorhub-app` (port traits) and `doorhub-domain` only.

mod input;
mod relay;

pub use input::{InputHandle, VirtualInput};
pub use relay::VirtualRelay;
