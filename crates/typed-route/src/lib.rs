#![warn(missing_docs)]
//! # typed-route
//!
//! Declare a route's params, query, headers, body and response once, as
//! schemas, and derive everything else from them.
//!
//! ## Overview
//!
//! - **Schema IR** with nullability, unions, recursion and bidirectional codecs
//! - **Validators** that decode requests and encode responses, reporting every
//!   issue at its exact path
//! - **OpenAPI documents** built from the schemas of every mounted route
//! - **TypeScript bindings** for clients
//! - **Route tree resolution** that recovers templates from a host router's
//!   compiled patterns
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Schema IR                             │
//! │       number · string · object · oneOf · lazy · transform    │
//! └───────┬───────────────────────┬───────────────────────┬──────┘
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//! ┌───────────────┐      ┌─────────────────┐     ┌─────────────────┐
//! │ Validator     │      │ DocCompiler     │     │ TypeRenderer    │
//! │ decode/encode │      │ OpenAPI 3.0     │     │ TypeScript      │
//! └───────┬───────┘      └────────┬────────┘     └────────┬────────┘
//!         │                       │                       │
//!         ▼                       └───────────┬───────────┘
//! ┌───────────────┐                           │
//! │ Endpoint      │──── activate() ────┐      │
//! │ production    │                    ▼      │
//! │ handler       │           ┌──────────────────────┐
//! └───────────────┘           │ Route tree resolver  │
//!                             │ RouterTree → RouteMap│
//!                             └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use typed_route::prelude::*;
//! use serde_json::json;
//!
//! async fn update_user(req: TypedRequest, reply: Reply) -> RouteResult<HttpResponse> {
//!     let body = req.body.unwrap_or_default();
//!     Ok(reply.send_transformed(json!({ "id": req.params["id"], "name": body["name"] })))
//! }
//!
//! let update = Endpoint::builder()
//!     .params(object([("id", cast_number())]))
//!     .body(object([("name", string())]))
//!     .returns(object([("id", number()), ("name", string())]))
//!     .handle(update_user);
//!
//! let mut app = Router::new()
//!     .mount("/users", Router::new().route(Method::Post, "/:id", update)?)?;
//!
//! let routes = resolve_routes(&mut app)?;
//! let openapi = openapi_document(&routes, &DocumentConfig::new("Users", "1.0.0"))?;
//! let bindings = render_bindings(&routes, &RenderConfig::default());
//! ```
//!
//! ## Error Handling
//!
//! Request validation failures are answered with the configured 4xx status
//! and a body listing the issues of each failing section:
//!
//! ```json
//! { "errors": { "body": [{ "path": "name", "errors": ["is required"] }] } }
//! ```
//!
//! Errors returned by application handlers use [`RouteError`] and
//! [`RouteErrorCode`], and are sanitized outside development mode.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod logging;
pub mod openapi;
pub mod router;
pub mod schema;
pub mod typescript;
pub mod validation;

#[cfg(test)]
mod tests;

pub use config::{ConfigValidationError, DocumentConfig, ValidationConfig};
pub use endpoint::{
    Activation, Endpoint, EndpointBuilder, EndpointMetadata, Handler, ProductionHandler, Reply,
    RequestErrors, TypedRequest,
};
pub use error::{
    CodecError, DocumentError, RouteError, RouteErrorCode, RouteResolutionError, RouteResult,
    SchemaDefinitionError,
};
pub use http::{HttpRequest, HttpResponse, Method};
pub use logging::RequestId;
pub use openapi::{DocCompiler, JsonSchema, OpenApiDocument, deep_merge, openapi_document};
pub use router::{
    HandlerSlot, Registration, RouteMap, RouteNode, Router, RouterTree, reconstruct_template,
    resolve_routes,
};
pub use schema::{Direction, Schema, SchemaKind};
pub use typescript::{RenderConfig, TypeRenderer, render_bindings};
pub use validation::{Issue, ValidationError, Validator};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::schema::builders::*;
    pub use crate::{
        // Configuration
        DocumentConfig,
        RenderConfig,
        ValidationConfig,
        // Schema
        Direction,
        Schema,
        SchemaKind,
        // Validation
        Issue,
        ValidationError,
        Validator,
        // Endpoints
        Endpoint,
        EndpointMetadata,
        Reply,
        TypedRequest,
        // HTTP
        HttpRequest,
        HttpResponse,
        Method,
        // Error handling
        CodecError,
        RouteError,
        RouteErrorCode,
        RouteResult,
        SchemaDefinitionError,
        // Routing
        RouteMap,
        Router,
        RouterTree,
        // Functions
        openapi_document,
        render_bindings,
        resolve_routes,
    };
}
