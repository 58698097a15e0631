//! Axum router assembly.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use doorhub_app::ports::RelayOutput;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Mounts the device API under `/api/v1`, the push channel at `/sse` and a
/// `/health` probe. When `static_dir` is set, files below it are served
/// for every other path. Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build<R>(state: AppState<R>, static_dir: Option<&Path>) -> Router
where
    R: RelayOutput + 'static,
{
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/sse", get(crate::sse::stream::<R>))
        .nest("/api/v1", crate::api::routes(Arc::clone(&state.policy)));
    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
