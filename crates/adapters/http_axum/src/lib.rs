//! # doorhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Authorize every `/api/v1` request: the declared origin must be on the
//!   allow-list and the caller identity is taken from the TLS client
//!   certificate (see [`auth`])
//! - Serve the **device control API** (`/api/v1/{device}`,
//!   `/api/v1/{device}/lock`)
//! - Serve the **push channel** at `/sse` — named server-sent events that
//!   keep every viewer's lock status in sync
//! - Map application results into HTTP responses
//!
//! ## Dependency rule
//! Depends on `doorhub-app` (ports, devices, broadcaster) and
//! `doorhub-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod auth;
pub mod body;
pub mod error;
pub mod router;
pub mod sse;
pub mod state;
