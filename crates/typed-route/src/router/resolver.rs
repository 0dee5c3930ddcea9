//! Route tree resolver.
//!
//! Walks a host router through [`RouterTree`], reconstructs the template of
//! every mount, activates typed endpoints and collects their metadata into a
//! [`RouteMap`] keyed by full template and method.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::template::reconstruct_template;
use super::tree::{HandlerSlot, RouteNode, RouterTree};
use crate::endpoint::EndpointMetadata;
use crate::error::RouteResolutionError;
use crate::http::Method;

/// Metadata of every typed endpoint, by template and method.
#[derive(Debug, Clone, Default)]
pub struct RouteMap {
    routes: BTreeMap<String, BTreeMap<Method, Arc<EndpointMetadata>>>,
}

impl RouteMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert metadata for a route. Returns `false`, leaving the map
    /// unchanged, if the route is already present.
    pub fn insert(
        &mut self,
        template: impl Into<String>,
        method: Method,
        metadata: Arc<EndpointMetadata>,
    ) -> bool {
        let methods = self.routes.entry(template.into()).or_default();
        if methods.contains_key(&method) {
            return false;
        }
        methods.insert(method, metadata);
        true
    }

    /// Metadata of one route.
    pub fn get(&self, template: &str, method: Method) -> Option<&Arc<EndpointMetadata>> {
        self.routes.get(template)?.get(&method)
    }

    /// All routes, sorted by template then method.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Method, &Arc<EndpointMetadata>)> {
        self.routes.iter().flat_map(|(template, methods)| {
            methods
                .iter()
                .map(move |(method, metadata)| (template.as_str(), *method, metadata))
        })
    }

    /// All templates, sorted.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    /// Whether no route was found.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Walk a router tree and collect the metadata of every typed endpoint.
///
/// Declared endpoints are activated and replaced in the tree by their
/// production handler. Handlers that do not come from this crate are left
/// alone and do not appear in the map. When two registrations share a
/// template and method, the first one wins.
///
/// # Errors
///
/// Returns [`RouteResolutionError`] if a mount pattern cannot be turned back
/// into a template.
pub fn resolve_routes(tree: &mut dyn RouterTree) -> Result<RouteMap, RouteResolutionError> {
    let mut routes = RouteMap::new();
    walk(tree, "/", &mut routes)?;
    debug!(routes = routes.len(), "Resolved route tree");
    Ok(routes)
}

fn walk(
    tree: &mut dyn RouterTree,
    prefix: &str,
    routes: &mut RouteMap,
) -> Result<(), RouteResolutionError> {
    for node in tree.nodes() {
        match node {
            RouteNode::Mount {
                pattern,
                params,
                children,
            } => {
                let fragment = reconstruct_template(pattern, params)
                    .map_err(|err| err.mounted_at(prefix))?;
                let mounted = join_paths(prefix, &fragment);
                trace!(pattern = %pattern, template = %mounted, "Entering mount");
                walk(children, &mounted, routes)?;
            }
            RouteNode::Endpoint {
                path,
                registrations,
            } => {
                let template = join_paths(prefix, path);
                for registration in registrations.iter_mut() {
                    let metadata = match &registration.slot {
                        HandlerSlot::Foreign(_) => {
                            trace!(
                                method = %registration.method,
                                template = %template,
                                "Skipping foreign handler"
                            );
                            continue;
                        }
                        HandlerSlot::Declared(endpoint) => {
                            let activation = endpoint.activate();
                            trace!(
                                method = %registration.method,
                                template = %template,
                                "Activated endpoint"
                            );
                            let metadata = Arc::clone(&activation.metadata);
                            registration.slot = HandlerSlot::Active {
                                handler: activation.handler,
                                metadata: activation.metadata,
                            };
                            metadata
                        }
                        HandlerSlot::Active { metadata, .. } => Arc::clone(metadata),
                    };
                    if !routes.insert(template.clone(), registration.method, metadata) {
                        warn!(
                            method = %registration.method,
                            template = %template,
                            "Duplicate route, keeping the first registration"
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

/// Join two path fragments with exactly one `/` between non-empty segments.
pub fn join_paths(base: &str, fragment: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(fragment.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
