//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use doorhub_domain::error::{DeviceError, DoorhubError, NotFoundError};

use crate::body::BodyError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Every way a request can fail, mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    /// The request origin is not on the allow-list.
    Forbidden,
    /// The action requires a certificate identity and none was presented.
    Unauthenticated,
    /// The request body exceeded its size cap.
    PayloadTooLarge,
    /// The request body was not the expected JSON shape.
    MalformedRequest,
    /// No API route matches the request path.
    UnknownRoute,
    /// Failure reported by the application layer.
    Domain(DoorhubError),
}

impl From<DoorhubError> for ApiError {
    fn from(err: DoorhubError) -> Self {
        Self::Domain(err)
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<BodyError> for ApiError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::TooLarge { .. } => Self::PayloadTooLarge,
            BodyError::Read(_) => Self::MalformedRequest,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Forbidden => (StatusCode::FORBIDDEN, "origin not allowed".to_string()),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "client certificate required".to_string(),
            ),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large".to_string(),
            ),
            Self::MalformedRequest => (
                StatusCode::BAD_REQUEST,
                "expected {\"status\": bool}".to_string(),
            ),
            Self::UnknownRoute => (StatusCode::NOT_FOUND, "no such route".to_string()),
            Self::Domain(DoorhubError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(DoorhubError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Domain(DoorhubError::Device(err @ DeviceError::Locked)) => {
                (StatusCode::LOCKED, err.to_string())
            }
            Self::Domain(DoorhubError::Device(err @ DeviceError::Busy)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            Self::Domain(DoorhubError::Hardware(err)) => {
                tracing::error!(error = %err, "hardware error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
