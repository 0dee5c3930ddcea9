//! Error types for schema construction, route resolution and request handling
//!
//! Errors fall into two groups:
//!
//! - **Startup errors** ([`SchemaDefinitionError`], [`RouteResolutionError`],
//!   [`DocumentError`]) are returned while schemas, routes and documentation
//!   are being built. They are meant to abort startup.
//! - **Request errors** ([`RouteError`]) are returned by application handlers
//!   and turned into HTTP responses by the production handler.
//!
//! Validation failures are not errors in this sense: they are collected into a
//! [`ValidationError`](crate::validation::ValidationError) and always answered
//! with a 4xx response.
//!
//! # Example
//! ```rust,ignore
//! use typed_route::{RouteError, RouteErrorCode};
//!
//! let error = RouteError::new(RouteErrorCode::NotFound, "User not found");
//! let error = RouteError::not_found("User not found"); // Convenience method
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::http::Method;

// =============================================================================
// Startup errors
// =============================================================================

/// A schema was composed in a way the compilers cannot give a meaning to.
///
/// Codecs may not inherit from another codec or from a union, because the
/// direction (decode or encode) applied to the parent becomes ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaDefinitionError {
    /// A transform or custom type was built on top of another codec
    #[error("`{name}` cannot inherit from {parent}: codecs cannot wrap other codecs")]
    CodecOverCodec {
        /// Name of the schema being defined
        name: String,
        /// Kind of the offending parent
        parent: &'static str,
    },
    /// A transform or custom type was built on top of a `oneOf`
    #[error("`{name}` cannot inherit from a oneOf: the matching branch is only known at runtime")]
    CodecOverUnion {
        /// Name of the schema being defined
        name: String,
    },
}

/// Failure returned by a `decode`, `encode` or refinement function.
///
/// The message is reported to the client verbatim at the path where the
/// function ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    /// Create a codec error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The message carried by this error
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for CodecError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for CodecError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// A mounted router's path pattern could not be turned back into a template.
///
/// Resolution stops at the first such pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot reconstruct route template from `{pattern}` (mounted under `{mounted_at}`): {reason}"
)]
pub struct RouteResolutionError {
    /// Pattern source as exposed by the host router
    pub pattern: String,
    /// Template accumulated from the enclosing mounts
    pub mounted_at: String,
    /// What went wrong
    pub reason: String,
}

impl RouteResolutionError {
    /// Create a resolution error for a pattern
    pub fn new(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mounted_at: "/".to_string(),
            reason: reason.into(),
        }
    }

    /// Record where in the tree the pattern was found
    pub fn mounted_at(mut self, path: impl Into<String>) -> Self {
        self.mounted_at = path.into();
        self
    }
}

/// An endpoint's schemas cannot be described as OpenAPI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} {template}: {reason}")]
pub struct DocumentError {
    /// Route template
    pub template: String,
    /// HTTP method
    pub method: Method,
    /// What went wrong
    pub reason: String,
}

// =============================================================================
// Request errors
// =============================================================================

/// Error codes for failures returned by application handlers.
///
/// When serialized to JSON, codes are converted to SCREAMING_SNAKE_CASE
/// (e.g., `NotFound` becomes `"NOT_FOUND"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum RouteErrorCode {
    // Client errors (4xx)
    /// The request was malformed or invalid
    BadRequest,
    /// Authentication is required
    Unauthorized,
    /// The authenticated user lacks permission
    Forbidden,
    /// The requested resource was not found
    NotFound,
    /// Input validation failed
    ValidationError,
    /// The request conflicts with current state
    Conflict,

    // Server errors (5xx)
    /// An unexpected internal error occurred
    InternalError,
    /// The requested functionality is not implemented
    NotImplemented,
    /// JSON serialization/deserialization failed
    SerializationError,
    /// The outgoing value did not match the declared response schema
    ResponseValidationError,
}

impl RouteErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::ResponseValidationError => "RESPONSE_VALIDATION_ERROR",
        }
    }

    /// HTTP status used when this error reaches the wire.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::ValidationError => 400,
            Self::Conflict => 409,
            Self::InternalError => 500,
            Self::NotImplemented => 501,
            Self::SerializationError => 500,
            Self::ResponseValidationError => 500,
        }
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

impl fmt::Display for RouteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by an application handler.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct RouteError {
    /// Error code
    pub code: RouteErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RouteError {
    /// Create a new error with code and message.
    pub fn new(code: RouteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        self.code.status()
    }

    /// Strip internal information from server errors unless running in
    /// development mode.
    pub fn sanitize(mut self, development_mode: bool) -> Self {
        if !development_mode && self.code.is_server_error() {
            debug!(
                original_code = %self.code,
                original_message = %self.message,
                "Sanitizing server error for client response"
            );
            self.message = "An internal error occurred".to_string();
            self.details = None;
        }
        self
    }

    /// Create a NOT_FOUND error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::NotFound, message)
    }

    /// Create a BAD_REQUEST error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::BadRequest, message)
    }

    /// Create a VALIDATION_ERROR error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::ValidationError, message)
    }

    /// Create an UNAUTHORIZED error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::Unauthorized, message)
    }

    /// Create a FORBIDDEN error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::Forbidden, message)
    }

    /// Create a CONFLICT error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::Conflict, message)
    }

    /// Create an INTERNAL_ERROR error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::InternalError, message)
    }

    /// Create a SERIALIZATION_ERROR error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(RouteErrorCode::SerializationError, message)
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

/// Result type alias for application handlers.
pub type RouteResult<T> = Result<T, RouteError>;
