//! Configuration for validation, request handling and documentation.
//!
//! [`ValidationConfig`] controls how validators treat input and how the
//! production handler reports failures. [`DocumentConfig`] carries the
//! caller-supplied parts of the OpenAPI document.
//!
//! # Example
//! ```rust,ignore
//! use typed_route::{DocumentConfig, ValidationConfig};
//!
//! let validation = ValidationConfig::new()
//!     .with_strict_objects(true)
//!     .with_error_status(422);
//! validation.validate()?;
//!
//! let docs = DocumentConfig::new("Pet Store", "1.2.0")
//!     .with_server("https://api.example.com");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// error_status must be a 4xx status code
    #[error("error_status must be a 4xx status code (got {0})")]
    InvalidErrorStatus(u16),
    /// document title must not be empty
    #[error("document title must not be empty")]
    EmptyTitle,
    /// document overrides must be a JSON object
    #[error("document overrides must be a JSON object")]
    InvalidOverrides,
}

/// Validation and request-handling configuration.
///
/// # Fields
///
/// * `strict_objects` - Report unknown object keys as issues instead of
///   carrying them through untouched. Default: false.
///
/// * `verify_output` - After a codec runs, check its output against the
///   codec's output-side schema. Default: true.
///
/// * `error_status` - Status sent when request validation fails. Must be 4xx.
///   Default: 400.
///
/// * `development_mode` - Include response-encoding issues and internal error
///   messages in 5xx bodies. Default: false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Reject unknown object keys (default: false)
    pub strict_objects: bool,
    /// Check codec output against the output-side schema (default: true)
    pub verify_output: bool,
    /// Status for request validation failures (default: 400)
    pub error_status: u16,
    /// Expose internal details in 5xx bodies (default: false)
    pub development_mode: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_objects: false,
            verify_output: true,
            error_status: 400,
            development_mode: false,
        }
    }
}

impl ValidationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `error_status` is not a 4xx status code.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(400..500).contains(&self.error_status) {
            return Err(ConfigValidationError::InvalidErrorStatus(self.error_status));
        }
        Ok(())
    }

    /// Set strict object mode.
    pub fn with_strict_objects(mut self, strict: bool) -> Self {
        self.strict_objects = strict;
        self
    }

    /// Enable or disable codec output verification.
    pub fn with_verify_output(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }

    /// Set the status sent on request validation failures.
    pub fn with_error_status(mut self, status: u16) -> Self {
        self.error_status = status;
        self
    }

    /// Enable or disable development mode.
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }
}

/// Caller-supplied parts of the OpenAPI document.
///
/// `overrides` is deep-merged over the generated document last, so any value
/// in it wins at any depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// API title (default: "API")
    pub title: String,
    /// API version (default: "1.0.0")
    pub version: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server URLs
    #[serde(default)]
    pub servers: Vec<String>,
    /// Values merged over the generated document
    #[serde(default)]
    pub overrides: Value,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            servers: Vec::new(),
            overrides: Value::Object(Default::default()),
        }
    }
}

impl DocumentConfig {
    /// Create a configuration with a title and version.
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is blank or `overrides` is neither null
    /// nor an object.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.title.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTitle);
        }
        if !(self.overrides.is_object() || self.overrides.is_null()) {
            return Err(ConfigValidationError::InvalidOverrides);
        }
        Ok(())
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a server URL.
    pub fn with_server(mut self, url: impl Into<String>) -> Self {
        self.servers.push(url.into());
        self
    }

    /// Set the values merged over the generated document.
    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = overrides;
        self
    }
}
