//! Route tree introspection.
//!
//! - [`tree`] defines the contract a host router implements,
//! - [`template`] turns compiled mount patterns back into templates,
//! - [`resolver`] walks a tree and builds the [`RouteMap`],
//! - [`host`] is a small reference router implementing the contract.

pub mod host;
pub mod resolver;
pub mod template;
pub mod tree;

pub use host::Router;
pub use resolver::{RouteMap, join_paths, resolve_routes};
pub use template::reconstruct_template;
pub use tree::{HandlerSlot, Registration, RouteNode, RouterTree};
