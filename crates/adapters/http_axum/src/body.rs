//! Bounded request-body reader.
//!
//! Reads a body into a buffer of fixed capacity and fails the moment that
//! capacity would be exceeded; no further bytes are pulled from the
//! connection after that.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, header};
use tokio_stream::StreamExt;

/// Why a body could not be read.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body is longer than `limit` bytes.
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The underlying stream failed.
    #[error("failed to read request body")]
    Read(#[source] axum::Error),
}

/// Read the whole body of `request`, refusing anything above `limit` bytes.
///
/// A `Content-Length` above `limit` is refused before any byte is read.
///
/// # Errors
///
/// [`BodyError::TooLarge`] as soon as the cap is exceeded,
/// [`BodyError::Read`] if the connection fails mid-body.
pub async fn read_bounded(request: Request, limit: usize) -> Result<Vec<u8>, BodyError> {
    if declared_length(request.headers()).is_some_and(|len| len > limit) {
        return Err(BodyError::TooLarge { limit });
    }
    read_body(request.into_body(), limit).await
}

async fn read_body(body: Body, limit: usize) -> Result<Vec<u8>, BodyError> {
    let mut buffer = Vec::with_capacity(limit);
    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if buffer.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
