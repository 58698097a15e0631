//! Request authorization — origin allow-list and certificate identity.
//!
//! Every `/api/v1` request passes through [`authorize`] before routing:
//!
//! 1. The origin is taken from the `Origin` header, or derived from
//!    `Referer` (`scheme://host[:port]`). It must match one allow-list entry
//!    exactly, otherwise the request is rejected with `403` before any
//!    device state is read.
//! 2. The caller identity is the Common Name of the client certificate the
//!    transport attached as a [`PeerCertificate`] extension. Without one the
//!    caller is anonymous.
//!
//! The result is stored as a [`RequestContext`] extension for handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Uri, header};
use axum::middleware::Next;
use axum::response::Response;

use doorhub_domain::identity::CallerIdentity;

use crate::error::ApiError;

/// Client certificate details attached to a request by the TLS transport.
#[derive(Debug, Clone, Default)]
pub struct PeerCertificate {
    common_name: Option<String>,
}

impl PeerCertificate {
    #[must_use]
    pub fn new(common_name: Option<String>) -> Self {
        Self { common_name }
    }

    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    #[must_use]
    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity::from(self.common_name.clone())
    }
}

/// Per-request authorization result, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The origin that passed the allow-list.
    pub origin: String,
    /// Certificate identity of the caller.
    pub caller: CallerIdentity,
}

/// Who may call the API.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_origins: Vec<String>,
    allow_anonymous: bool,
}

impl AccessPolicy {
    pub fn new(allowed_origins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
            allow_anonymous: true,
        }
    }

    /// Whether callers without a certificate identity may change device state.
    #[must_use]
    pub fn allow_anonymous(mut self, allow: bool) -> Self {
        self.allow_anonymous = allow;
        self
    }

    #[must_use]
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    /// Decide whether `caller` may perform a state-changing action.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthenticated`] for an anonymous caller when anonymous
    /// access is disabled.
    pub fn admit(&self, caller: CallerIdentity) -> Result<CallerIdentity, ApiError> {
        if caller.is_anonymous() && !self.allow_anonymous {
            return Err(ApiError::Unauthenticated);
        }
        Ok(caller)
    }
}

/// Middleware checking the origin and recording the caller identity.
///
/// # Errors
///
/// [`ApiError::Forbidden`] when no origin can be determined or it is not on
/// the allow-list.
pub async fn authorize(
    State(policy): State<Arc<AccessPolicy>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(origin) = request_origin(request.headers()) else {
        tracing::warn!(uri = %request.uri(), "request without origin rejected");
        return Err(ApiError::Forbidden);
    };
    if !policy.allows_origin(&origin) {
        tracing::warn!(%origin, uri = %request.uri(), "request from untrusted origin rejected");
        return Err(ApiError::Forbidden);
    }

    let caller = request
        .extensions()
        .get::<PeerCertificate>()
        .map(PeerCertificate::identity)
        .unwrap_or_default();
    request
        .extensions_mut()
        .insert(RequestContext { origin, caller });

    Ok(next.run(request).await)
}

/// The origin a request declares: `Origin`, falling back to the origin of
/// `Referer`.
#[must_use]
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN) {
        return origin.to_str().ok().map(str::to_string);
    }
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    origin_of(referer)
}

/// `scheme://host[:port]` of an absolute URL, with the default port elided.
fn origin_of(url: &str) -> Option<String> {
    let uri: Uri = url.parse().ok()?;
    let scheme = uri.scheme_str()?.to_ascii_lowercase();
    let authority = uri.authority()?;
    let host = authority.host().to_ascii_lowercase();
    let default_port = match scheme.as_str() {
        "https" => Some(443),
        "http" => Some(80),
        _ => None,
    };
    match authority.port_u16() {
        Some(port) if Some(port) != default_port => Some(format!("{scheme}://{host}:{port}")),
        _ => Some(format!("{scheme}://{host}")),
    }
}
