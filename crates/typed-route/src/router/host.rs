//! Reference host router.
//!
//! A small express-style router used to exercise the [`RouterTree`] contract
//! end to end. Paths use `:name` segments. Mounted sub-routers expose their
//! prefix the way such routers store it, as a compiled pattern source
//! (`/^\/users\/(?:([^\/]+?))\/?(?=\/|$)/i`) plus parameter names, and
//! requests are matched with an equivalent case-insensitive regex.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_route::prelude::*;
//!
//! let users = Router::new().route(Method::Get, "/:id", get_user)?;
//! let mut app = Router::new().mount("/users", users)?;
//!
//! let routes = resolve_routes(&mut app)?;
//! let response = app.dispatch(HttpRequest::new(Method::Get, "/users/7")).await;
//! ```

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::tree::{HandlerSlot, Registration, RouteNode, RouterTree};
use crate::endpoint::{Endpoint, ProductionHandler};
use crate::error::{RouteError, RouteResolutionError};
use crate::http::{HttpRequest, HttpResponse, Method};

/// Characters escaped in pattern sources.
const REGEX_META: &[char] = &[
    '\\', '/', '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$',
];

/// A compiled `:name` path.
#[derive(Debug, Clone)]
struct CompiledPath {
    source: String,
    params: Vec<String>,
    matcher: Regex,
}

impl CompiledPath {
    /// Compile a path. Leaf paths must match completely; prefix paths match
    /// up to a segment boundary and capture the rest as `rest`.
    fn compile(path: &str, prefix: bool) -> Result<Self, RouteResolutionError> {
        let mut source = String::from("^");
        let mut matcher = String::from("(?i)^");
        let mut params = Vec::new();

        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            source.push_str(r"\/");
            matcher.push('/');
            match segment.strip_prefix(':') {
                Some(name) => {
                    let valid = !name.is_empty()
                        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                    if !valid {
                        return Err(RouteResolutionError::new(
                            path,
                            format!("invalid parameter name `{}`", name),
                        ));
                    }
                    source.push_str(r"(?:([^\/]+?))");
                    matcher.push_str("([^/]+)");
                    params.push(name.to_string());
                }
                None => {
                    for c in segment.chars() {
                        if REGEX_META.contains(&c) {
                            source.push('\\');
                        }
                        source.push(c);
                    }
                    matcher.push_str(&regex::escape(segment));
                }
            }
        }

        if prefix {
            source.push_str(r"\/?(?=\/|$)");
            matcher.push_str("(?P<rest>/.*)?$");
        } else {
            source.push_str(r"\/?$");
            matcher.push_str("/?$");
        }

        let matcher = Regex::new(&matcher).map_err(|err| {
            RouteResolutionError::new(path, format!("cannot compile matcher: {}", err))
        })?;
        Ok(Self {
            source: format!("/{}/i", source),
            params,
            matcher,
        })
    }

    /// Match `path`, adding captured parameters to `params`. Returns the
    /// unmatched remainder for prefix paths.
    fn matches<'p>(&self, path: &'p str, params: &mut Map<String, Value>) -> Option<&'p str> {
        let captures = self.matcher.captures(path)?;
        for (index, name) in self.params.iter().enumerate() {
            if let Some(value) = captures.get(index + 1) {
                params.insert(name.clone(), Value::String(value.as_str().to_string()));
            }
        }
        Some(captures.name("rest").map_or("/", |rest| rest.as_str()))
    }
}

#[derive(Debug)]
struct RouteLayer {
    path: String,
    compiled: CompiledPath,
    registrations: Vec<Registration>,
}

#[derive(Debug)]
struct MountLayer {
    compiled: CompiledPath,
    router: Router,
}

#[derive(Debug)]
enum Layer {
    Route(RouteLayer),
    Mount(MountLayer),
}

/// Express-style router with typed and foreign handlers.
#[derive(Debug, Default)]
pub struct Router {
    layers: Vec<Layer>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RouteResolutionError`] if the path has an invalid parameter
    /// name.
    pub fn route(
        self,
        method: Method,
        path: &str,
        endpoint: Endpoint,
    ) -> Result<Self, RouteResolutionError> {
        self.register(path, Registration::declared(method, endpoint))
    }

    /// Register a host-native handler.
    ///
    /// # Errors
    ///
    /// Returns [`RouteResolutionError`] if the path has an invalid parameter
    /// name.
    pub fn foreign(
        self,
        method: Method,
        path: &str,
        handler: ProductionHandler,
    ) -> Result<Self, RouteResolutionError> {
        self.register(path, Registration::foreign(method, handler))
    }

    /// Mount a sub-router under a path prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RouteResolutionError`] if the prefix has an invalid parameter
    /// name.
    pub fn mount(mut self, prefix: &str, router: Router) -> Result<Self, RouteResolutionError> {
        let compiled = CompiledPath::compile(prefix, true)?;
        self.layers.push(Layer::Mount(MountLayer { compiled, router }));
        Ok(self)
    }

    fn register(
        mut self,
        path: &str,
        registration: Registration,
    ) -> Result<Self, RouteResolutionError> {
        let existing = self.layers.iter_mut().find_map(|layer| match layer {
            Layer::Route(route) if route.path == path => Some(route),
            _ => None,
        });
        match existing {
            Some(route) => route.registrations.push(registration),
            None => {
                let compiled = CompiledPath::compile(path, false)?;
                self.layers.push(Layer::Route(RouteLayer {
                    path: path.to_string(),
                    compiled,
                    registrations: vec![registration],
                }));
            }
        }
        Ok(self)
    }

    /// Find the handler for a request, collecting path parameters.
    fn find(
        &self,
        method: Method,
        path: &str,
        params: &mut Map<String, Value>,
    ) -> Option<ProductionHandler> {
        for layer in &self.layers {
            match layer {
                Layer::Route(route) => {
                    let mut captured = params.clone();
                    if route.compiled.matches(path, &mut captured).is_none() {
                        continue;
                    }
                    let registration = route.registrations.iter().find(|r| r.method == method);
                    if let Some(registration) = registration {
                        *params = captured;
                        return Some(registration.slot.handler());
                    }
                }
                Layer::Mount(mount) => {
                    let mut captured = params.clone();
                    let Some(rest) = mount.compiled.matches(path, &mut captured) else {
                        continue;
                    };
                    if let Some(handler) = mount.router.find(method, rest, &mut captured) {
                        *params = captured;
                        return Some(handler);
                    }
                }
            }
        }
        None
    }

    /// Route a request to its handler. Unknown routes get a 404.
    pub async fn dispatch(&self, mut request: HttpRequest) -> HttpResponse {
        let mut params = Map::new();
        match self.find(request.method, &request.path, &mut params) {
            Some(handler) => {
                request.params = params;
                handler(request).await
            }
            None => {
                debug!(method = %request.method, path = %request.path, "No route matched");
                HttpResponse::from_error(&RouteError::not_found(format!(
                    "No route for {} {}",
                    request.method, request.path
                )))
            }
        }
    }

    /// Whether every typed handler has been activated.
    pub fn is_resolved(&self) -> bool {
        self.layers.iter().all(|layer| match layer {
            Layer::Route(route) => route
                .registrations
                .iter()
                .all(|r| !matches!(r.slot, HandlerSlot::Declared(_))),
            Layer::Mount(mount) => mount.router.is_resolved(),
        })
    }
}

impl RouterTree for Router {
    fn nodes(&mut self) -> Vec<RouteNode<'_>> {
        self.layers
            .iter_mut()
            .map(|layer| match layer {
                Layer::Route(route) => RouteNode::Endpoint {
                    path: &route.path,
                    registrations: &mut route.registrations,
                },
                Layer::Mount(mount) => RouteNode::Mount {
                    pattern: &mount.compiled.source,
                    params: &mount.compiled.params,
                    children: &mut mount.router,
                },
            })
            .collect()
    }
}
