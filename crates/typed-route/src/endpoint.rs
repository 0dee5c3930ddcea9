//! Typed endpoints and their production handlers.
//!
//! An [`Endpoint`] bundles the schemas of a route (params, query, headers,
//! body, response) with an async application handler. Hosts never call the
//! application handler directly. They call [`Endpoint::activate`], which
//! returns the endpoint's metadata together with a [`ProductionHandler`] that
//! validates every request section, runs codecs, and only then hands decoded
//! values to the application.
//!
//! Activation is memoized on the endpoint, so an endpoint mounted at several
//! paths shares one metadata value and one production handler.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_route::prelude::*;
//! use serde_json::json;
//!
//! async fn get_user(req: TypedRequest, reply: Reply) -> RouteResult<HttpResponse> {
//!     let id = req.params["id"].clone();
//!     Ok(reply.send_transformed(json!({ "id": id, "name": "Ada" })))
//! }
//!
//! let endpoint = Endpoint::builder()
//!     .params(object([("id", cast_number())]))
//!     .returns(object([("id", number()), ("name", string())]))
//!     .handle(get_user);
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::{Instrument, debug, error, trace, warn};

use crate::config::{ConfigValidationError, ValidationConfig};
use crate::error::{RouteError, RouteErrorCode, RouteResult};
use crate::http::{HttpRequest, HttpResponse, Method};
use crate::logging::{RequestId, request_span};
use crate::schema::{Direction, Schema};
use crate::validation::{Issue, ValidationError, Validator};

/// Type-erased handler installed in the host router.
pub type ProductionHandler =
    Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

/// Boxed application handler for type erasure
type BoxedHandler =
    Arc<dyn Fn(TypedRequest, Reply) -> BoxFuture<'static, RouteResult<HttpResponse>> + Send + Sync>;

/// Trait for application handler functions
///
/// Automatically implemented for async functions with the signature:
/// `async fn(TypedRequest, Reply) -> RouteResult<HttpResponse>`
pub trait Handler: Clone + Send + Sync + 'static {
    /// The future type returned by the handler
    type Future: Future<Output = RouteResult<HttpResponse>> + Send + 'static;

    /// Call the handler with the decoded request
    fn call(&self, request: TypedRequest, reply: Reply) -> Self::Future;
}

impl<F, Fut> Handler for F
where
    F: Fn(TypedRequest, Reply) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = RouteResult<HttpResponse>> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, request: TypedRequest, reply: Reply) -> Self::Future {
        (self)(request, reply)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Schemas declared by an endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointMetadata {
    /// Path parameters; must be an object schema
    pub params: Option<Schema>,
    /// Query string; must be an object schema
    pub query: Option<Schema>,
    /// Request headers; must be an object schema
    pub headers: Option<Schema>,
    /// Request body
    pub body: Option<Schema>,
    /// Response body
    pub response: Option<Schema>,
}

/// Result of activating an endpoint.
#[derive(Clone)]
pub struct Activation {
    /// Declared schemas
    pub metadata: Arc<EndpointMetadata>,
    /// Handler to install in the host router
    pub handler: ProductionHandler,
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Endpoint
// =============================================================================

/// Builder for [`Endpoint`].
#[derive(Debug, Clone, Default)]
pub struct EndpointBuilder {
    metadata: EndpointMetadata,
    config: ValidationConfig,
}

impl EndpointBuilder {
    /// Declare the path parameter schema.
    pub fn params(mut self, schema: Schema) -> Self {
        self.metadata.params = Some(schema);
        self
    }

    /// Declare the query string schema.
    pub fn query(mut self, schema: Schema) -> Self {
        self.metadata.query = Some(schema);
        self
    }

    /// Declare the header schema. Property names should be lower-case.
    pub fn headers(mut self, schema: Schema) -> Self {
        self.metadata.headers = Some(schema);
        self
    }

    /// Declare the request body schema.
    pub fn body(mut self, schema: Schema) -> Self {
        self.metadata.body = Some(schema);
        self
    }

    /// Declare the response body schema.
    pub fn returns(mut self, schema: Schema) -> Self {
        self.metadata.response = Some(schema);
        self
    }

    /// Set the validation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] if the configuration is invalid.
    pub fn config(mut self, config: ValidationConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Attach the application handler.
    pub fn handle<H: Handler>(self, handler: H) -> Endpoint {
        let boxed: BoxedHandler = Arc::new(move |request: TypedRequest, reply: Reply| {
            handler.call(request, reply).boxed()
        });
        Endpoint {
            inner: Arc::new(EndpointInner {
                metadata: Arc::new(self.metadata),
                config: self.config,
                handler: boxed,
                activation: OnceLock::new(),
            }),
        }
    }
}

struct EndpointInner {
    metadata: Arc<EndpointMetadata>,
    config: ValidationConfig,
    handler: BoxedHandler,
    activation: OnceLock<Activation>,
}

/// An application handler together with its schemas.
///
/// Cloning an endpoint is cheap and clones share the activation.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("metadata", &self.inner.metadata)
            .field("activated", &self.is_activated())
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Start declaring an endpoint.
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::default()
    }

    /// Declared schemas.
    pub fn metadata(&self) -> &Arc<EndpointMetadata> {
        &self.inner.metadata
    }

    /// Whether [`activate`](Self::activate) has run.
    pub fn is_activated(&self) -> bool {
        self.inner.activation.get().is_some()
    }

    /// Compile the endpoint's validators and return its metadata and
    /// production handler.
    ///
    /// Idempotent: the first call compiles, later calls return the same
    /// metadata and handler.
    pub fn activate(&self) -> Activation {
        self.inner
            .activation
            .get_or_init(|| {
                trace!("Activating endpoint");
                let compiled = Arc::new(Compiled::new(&self.inner));
                let handler: ProductionHandler = Arc::new(move |request: HttpRequest| {
                    let compiled = Arc::clone(&compiled);
                    async move { compiled.serve(request).await }.boxed()
                });
                Activation {
                    metadata: Arc::clone(&self.inner.metadata),
                    handler,
                }
            })
            .clone()
    }
}

// =============================================================================
// Request handling
// =============================================================================

/// Validation issues of a rejected request, per section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestErrors {
    /// Path parameter issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Issue>>,
    /// Query string issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Vec<Issue>>,
    /// Body issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<Issue>>,
    /// Header issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Issue>>,
}

impl RequestErrors {
    fn is_empty(&self) -> bool {
        self.params.is_none()
            && self.query.is_none()
            && self.body.is_none()
            && self.headers.is_none()
    }
}

/// Validators compiled once per endpoint.
struct Compiled {
    params: Option<Validator>,
    query: Option<Validator>,
    headers: Option<Validator>,
    body: Option<Validator>,
    response: Option<Validator>,
    config: ValidationConfig,
    handler: BoxedHandler,
}

impl Compiled {
    fn new(endpoint: &EndpointInner) -> Self {
        let config = endpoint.config.clone();
        let compile = |schema: &Option<Schema>, direction: Direction| {
            schema
                .clone()
                .map(|schema| Validator::new(schema, direction).with_config(config.clone()))
        };
        let metadata = &endpoint.metadata;
        Self {
            params: compile(&metadata.params, Direction::Decode),
            query: compile(&metadata.query, Direction::Decode),
            headers: compile(&metadata.headers, Direction::Decode),
            body: compile(&metadata.body, Direction::Decode),
            response: compile(&metadata.response, Direction::Encode),
            handler: Arc::clone(&endpoint.handler),
            config,
        }
    }

    async fn serve(&self, request: HttpRequest) -> HttpResponse {
        let request_id = RequestId::from_headers(&request.headers);
        let span = request_span(&request_id, request.method, &request.path);
        self.serve_inner(request, request_id).instrument(span).await
    }

    async fn serve_inner(&self, request: HttpRequest, request_id: RequestId) -> HttpResponse {
        let HttpRequest {
            method,
            path,
            params,
            query,
            headers,
            body,
        } = request;

        let mut errors = RequestErrors::default();
        let params = decode_section(&self.params, Some(Value::Object(params)), &mut errors.params);
        let query = decode_section(&self.query, Some(Value::Object(query)), &mut errors.query);
        let headers = decode_section(
            &self.headers,
            Some(Value::Object(headers)),
            &mut errors.headers,
        );
        let body = decode_section(&self.body, body, &mut errors.body);

        if !errors.is_empty() {
            debug!(
                status = self.config.error_status,
                params = errors.params.is_some(),
                query = errors.query.is_some(),
                headers = errors.headers.is_some(),
                body = errors.body.is_some(),
                "Rejected request"
            );
            return HttpResponse::json(
                self.config.error_status,
                serde_json::json!({ "errors": errors }),
            );
        }

        let typed = TypedRequest {
            method,
            path,
            request_id,
            params: params.unwrap_or(Value::Null),
            query: query.unwrap_or(Value::Null),
            headers: headers.unwrap_or(Value::Null),
            body,
        };
        let reply = Reply {
            response: self.response.clone(),
            development_mode: self.config.development_mode,
            status: 200,
        };

        trace!("Executing handler");
        match (self.handler)(typed, reply).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    error_code = %err.code,
                    error_message = %err.message,
                    "Handler execution failed"
                );
                HttpResponse::from_error(&err.sanitize(self.config.development_mode))
            }
        }
    }
}

/// Decode one request section, recording its issues on failure.
fn decode_section(
    validator: &Option<Validator>,
    value: Option<Value>,
    issues: &mut Option<Vec<Issue>>,
) -> Option<Value> {
    let Some(validator) = validator else {
        return value;
    };
    match validator.validate_optional(value.as_ref()) {
        Ok(decoded) => decoded,
        Err(err) => {
            *issues = Some(err.into_issues());
            None
        }
    }
}

/// Request sections after validation and decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRequest {
    /// Request method
    pub method: Method,
    /// Request path
    pub path: String,
    /// Correlation ID of this request
    pub request_id: RequestId,
    /// Decoded path parameters
    pub params: Value,
    /// Decoded query string
    pub query: Value,
    /// Decoded headers
    pub headers: Value,
    /// Decoded body, if one was sent
    pub body: Option<Value>,
}

impl TypedRequest {
    /// Deserialize the decoded path parameters.
    pub fn params_as<T: DeserializeOwned>(&self) -> RouteResult<T> {
        Ok(T::deserialize(&self.params)?)
    }

    /// Deserialize the decoded query string.
    pub fn query_as<T: DeserializeOwned>(&self) -> RouteResult<T> {
        Ok(T::deserialize(&self.query)?)
    }

    /// Deserialize the decoded headers.
    pub fn headers_as<T: DeserializeOwned>(&self) -> RouteResult<T> {
        Ok(T::deserialize(&self.headers)?)
    }

    /// Deserialize the decoded body. A missing body deserializes from null.
    pub fn body_as<T: DeserializeOwned>(&self) -> RouteResult<T> {
        match &self.body {
            Some(body) => Ok(T::deserialize(body)?),
            None => Ok(T::deserialize(&Value::Null)?),
        }
    }
}

/// Writes responses through the endpoint's response schema.
#[derive(Debug, Clone)]
pub struct Reply {
    response: Option<Validator>,
    development_mode: bool,
    status: u16,
}

impl Reply {
    /// Use a status other than 200 for the response.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Encode `value` through the response schema and send it.
    ///
    /// A value that does not match the schema is a server bug and yields a
    /// 500. The issues are only included in development mode.
    pub fn send_transformed(&self, value: Value) -> HttpResponse {
        let Some(validator) = &self.response else {
            return HttpResponse::json(self.status, value);
        };
        match validator.validate(&value) {
            Ok(encoded) => HttpResponse::json(self.status, encoded),
            Err(issues) => self.response_mismatch(issues),
        }
    }

    /// Serialize `value` and send it through [`send_transformed`](Self::send_transformed).
    pub fn send_typed<T: Serialize>(&self, value: &T) -> HttpResponse {
        match serde_json::to_value(value) {
            Ok(value) => self.send_transformed(value),
            Err(err) => {
                error!(error = %err, "Response serialization failed");
                HttpResponse::from_error(&RouteError::from(err).sanitize(self.development_mode))
            }
        }
    }

    /// Send a value as-is, bypassing the response schema.
    pub fn send_raw(&self, value: Value) -> HttpResponse {
        HttpResponse::json(self.status, value)
    }

    fn response_mismatch(&self, issues: ValidationError) -> HttpResponse {
        error!(
            issue_count = issues.len(),
            paths = ?issues.paths(),
            "Response does not match its declared schema"
        );
        let err = RouteError::new(
            RouteErrorCode::ResponseValidationError,
            "Response does not match its declared schema",
        )
        .with_details(issues);
        HttpResponse::from_error(&err.sanitize(self.development_mode))
    }
}
