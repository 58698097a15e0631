//! # doorhub-domain
//!
//! Pure domain model for the doorhub access controller.
//!
//! ## Responsibilities
//! - Foundational types: device names, caller identities, error conventions
//! - Define the **actuator state machine** (idle/locked/actuating transitions)
//! - Define **notifications** emitted by devices and the **push events**
//!   they become once fanned out to subscribers
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod identity;

pub mod device;
pub mod event;
