//! Device control API mounted under `/api/v1`.

#[allow(clippy::missing_errors_doc)]
pub mod devices;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::post;

use doorhub_app::ports::RelayOutput;

use crate::auth::{AccessPolicy, authorize};
use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api/v1` sub-router.
///
/// The authorization layer wraps every route and the fallback, so a
/// request from an untrusted origin is refused with `403` whatever path it
/// targets.
pub fn routes<R>(policy: Arc<AccessPolicy>) -> Router<AppState<R>>
where
    R: RelayOutput + 'static,
{
    Router::new()
        .route("/{device}", post(devices::open::<R>))
        .route(
            "/{device}/lock",
            post(devices::set_lock::<R>).get(devices::get_lock::<R>),
        )
        .fallback(unknown_route)
        .layer(middleware::from_fn_with_state(policy, authorize))
}

async fn unknown_route() -> ApiError {
    ApiError::UnknownRoute
}
