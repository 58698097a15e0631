//! JSON REST handlers for actuator devices.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, FromRequestParts, Path, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use doorhub_app::actuator::ActuatorDevice;
use doorhub_app::ports::RelayOutput;
use doorhub_domain::error::NotFoundError;

use crate::auth::RequestContext;
use crate::body::read_bounded;
use crate::error::ApiError;
use crate::state::AppState;

/// Largest accepted body for a lock change. `{"status":false}` fits exactly.
pub const LOCK_BODY_LIMIT: usize = 16;

/// Response body of the lock query.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockStatus {
    pub status: bool,
}

/// Request body of the lock change.
#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub status: bool,
}

impl LockRequest {
    /// Parse a lock change body; `status` must be a JSON boolean.
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body).map_err(|err| {
            tracing::debug!(%err, "malformed lock request");
            ApiError::MalformedRequest
        })
    }
}

/// The device named by the `{device}` path segment.
///
/// Rejects with `404` when no such device is registered.
pub struct ResolvedDevice<R>(pub Arc<ActuatorDevice<R>>);

impl<R> FromRequestParts<AppState<R>> for ResolvedDevice<R>
where
    R: Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R>,
    ) -> Result<Self, Self::Rejection> {
        // A segment that does not decode to UTF-8 cannot name a device.
        let Path(name) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| NotFoundError {
                entity: "Device",
                name: raw_segment(parts).to_string(),
            })?;
        let device = state.registry.get(&name)?;
        Ok(Self(Arc::clone(device)))
    }
}

/// First path segment below the API root, still percent-encoded.
fn raw_segment(parts: &Parts) -> &str {
    parts
        .uri
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}

/// Possible responses from the trigger endpoint.
pub enum OpenResponse {
    NoContent,
}

impl IntoResponse for OpenResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Possible responses from the lock query endpoint.
pub enum GetLockResponse {
    Ok(Json<LockStatus>),
}

impl IntoResponse for GetLockResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the lock change endpoint.
pub enum SetLockResponse {
    NoContent,
}

impl IntoResponse for SetLockResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `POST /api/v1/{device}`
pub async fn open<R>(
    State(state): State<AppState<R>>,
    Extension(context): Extension<RequestContext>,
    ResolvedDevice(device): ResolvedDevice<R>,
) -> Result<OpenResponse, ApiError>
where
    R: RelayOutput + 'static,
{
    let caller = state.policy.admit(context.caller)?;
    tracing::debug!(device = %device.name(), origin = %context.origin, %caller, "open requested");
    device.open(caller).await?;
    Ok(OpenResponse::NoContent)
}

/// `GET /api/v1/{device}/lock`
pub async fn get_lock<R>(
    ResolvedDevice(device): ResolvedDevice<R>,
) -> Result<GetLockResponse, ApiError>
where
    R: RelayOutput + 'static,
{
    Ok(GetLockResponse::Ok(Json(LockStatus {
        status: device.is_locked(),
    })))
}

/// `POST /api/v1/{device}/lock`
pub async fn set_lock<R>(
    State(state): State<AppState<R>>,
    Extension(context): Extension<RequestContext>,
    ResolvedDevice(device): ResolvedDevice<R>,
    request: Request,
) -> Result<SetLockResponse, ApiError>
where
    R: RelayOutput + 'static,
{
    let caller = state.policy.admit(context.caller)?;
    let body = read_bounded(request, LOCK_BODY_LIMIT).await?;
    let LockRequest { status } = LockRequest::parse(&body)?;
    tracing::debug!(device = %device.name(), origin = %context.origin, %caller, status, "lock change requested");
    device.set_locked(caller, status)?;
    Ok(SetLockResponse::NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_boolean_status() {
        assert!(LockRequest::parse(br#"{"status":true}"#).unwrap().status);
        assert!(!LockRequest::parse(br#"{"status":false}"#).unwrap().status);
    }

    #[test]
    fn should_reject_non_boolean_status() {
        for body in [
            &br#"{"status":"true"}"#[..],
            br#"{"status":1}"#,
            br#"{"status":null}"#,
            br#"{}"#,
            br#"true"#,
            b"",
            b"status=1",
        ] {
            assert!(
                matches!(LockRequest::parse(body), Err(ApiError::MalformedRequest)),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn should_serialize_lock_status() {
        let json = serde_json::to_string(&LockStatus { status: false }).unwrap();
        assert_eq!(json, r#"{"status":false}"#);
    }

    #[test]
    fn should_fit_largest_valid_body_in_limit() {
        assert_eq!(br#"{"status":false}"#.len(), LOCK_BODY_LIMIT);
    }
}
