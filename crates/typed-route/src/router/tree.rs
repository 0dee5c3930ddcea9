//! Adapter contract between a host router and the resolver.
//!
//! A host exposes its registered routes as a tree of [`RouteNode`]s. Mount
//! nodes carry the compiled pattern of a sub-router, as the host stores it,
//! plus the ordered names of its parameters. Endpoint nodes carry the
//! handlers registered at one path, one [`Registration`] per method.
//!
//! The resolver rewrites [`HandlerSlot::Declared`] slots in place, which is
//! why the contract hands out mutable borrows.

use std::fmt;
use std::sync::Arc;

use crate::endpoint::{Endpoint, EndpointMetadata, ProductionHandler};
use crate::http::Method;

/// A router whose registered routes can be walked.
pub trait RouterTree {
    /// Direct children of this router, in registration order.
    fn nodes(&mut self) -> Vec<RouteNode<'_>>;
}

/// One child of a router.
pub enum RouteNode<'a> {
    /// A sub-router mounted under a path pattern
    Mount {
        /// Pattern source, e.g. `/^\/users\/(?:([^\/]+?))\/?(?=\/|$)/i`
        pattern: &'a str,
        /// Parameter names, in capture-group order
        params: &'a [String],
        /// The mounted router
        children: &'a mut dyn RouterTree,
    },
    /// Handlers registered at one path
    Endpoint {
        /// Path as registered, e.g. `/:id`
        path: &'a str,
        /// Handlers, one per method
        registrations: &'a mut Vec<Registration>,
    },
}

/// A handler registered for one method.
#[derive(Clone, Debug)]
pub struct Registration {
    /// HTTP method
    pub method: Method,
    /// The handler
    pub slot: HandlerSlot,
}

impl Registration {
    /// Register a typed endpoint.
    pub fn declared(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            slot: HandlerSlot::Declared(endpoint),
        }
    }

    /// Register a handler that does not come from this crate.
    pub fn foreign(method: Method, handler: ProductionHandler) -> Self {
        Self {
            method,
            slot: HandlerSlot::Foreign(handler),
        }
    }
}

/// What a registration holds.
#[derive(Clone)]
pub enum HandlerSlot {
    /// A host-native handler with no schemas
    Foreign(ProductionHandler),
    /// A typed endpoint that has not been activated yet
    Declared(Endpoint),
    /// An activated endpoint
    Active {
        /// Production handler
        handler: ProductionHandler,
        /// Declared schemas
        metadata: Arc<EndpointMetadata>,
    },
}

impl HandlerSlot {
    /// Handler to run for a request. Declared endpoints are activated here
    /// if the resolver has not done so yet.
    pub fn handler(&self) -> ProductionHandler {
        match self {
            Self::Foreign(handler) => Arc::clone(handler),
            Self::Declared(endpoint) => endpoint.activate().handler,
            Self::Active { handler, .. } => Arc::clone(handler),
        }
    }

    /// Declared schemas, for typed slots.
    pub fn metadata(&self) -> Option<Arc<EndpointMetadata>> {
        match self {
            Self::Foreign(_) => None,
            Self::Declared(endpoint) => Some(Arc::clone(endpoint.metadata())),
            Self::Active { metadata, .. } => Some(Arc::clone(metadata)),
        }
    }
}

impl fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreign(_) => f.write_str("Foreign"),
            Self::Declared(endpoint) => f.debug_tuple("Declared").field(endpoint).finish(),
            Self::Active { metadata, .. } => f
                .debug_struct("Active")
                .field("metadata", metadata)
                .finish_non_exhaustive(),
        }
    }
}
