//! Request correlation for structured logs.
//!
//! Each request handled by a production handler runs inside a `tracing` span
//! carrying a [`RequestId`]. A client-supplied `x-request-id` header is reused
//! when present so logs can be joined across services.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::Span;

use crate::http::Method;

/// Header read and echoed for request correlation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Unique identifier for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)).to_string())
    }

    /// Reuses the `x-request-id` header when it is a non-empty string,
    /// otherwise generates a new ID.
    pub fn from_headers(headers: &Map<String, Value>) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self(id.to_string()))
            .unwrap_or_default()
    }

    /// Returns the request ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span wrapping the handling of one request.
///
/// `path` is the concrete request path, not the route template.
pub fn request_span(request_id: &RequestId, method: Method, path: &str) -> Span {
    tracing::debug_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    )
}
