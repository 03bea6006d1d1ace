//! Route nodes: one per directory of the routes hierarchy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::handlers::{HandlerModule, HandlerRegistry};

/// Id of the routes root node.
pub const ROOT_ID: &str = "$root";

/// Id (and directory name) of the fallback node.
pub const CATCHALL_ID: &str = "catchall";

/// A page or layout component file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentModule {
    /// Absolute path of the component file.
    pub path: PathBuf,
    /// Import path relative to the routes root without extension,
    /// e.g. `blog/_slug/page`.
    pub import_path: String,
}

impl ComponentModule {
    pub(crate) fn new(path: PathBuf, route_path: &str, stem: &str) -> Self {
        let import_path = if route_path.is_empty() {
            stem.to_string()
        } else {
            format!("{}/{}", route_path, stem)
        };
        Self { path, import_path }
    }
}

/// A handler module bound to a node, with its registry.
#[derive(Debug, Clone)]
pub struct HandlerBinding {
    /// The handler file found in the directory.
    pub path: PathBuf,
    pub module: Arc<HandlerModule>,
    pub registry: Arc<HandlerRegistry>,
}

/// One directory of the routes hierarchy.
#[derive(Debug, Clone)]
pub struct RouteNode {
    /// `$root`, `catchall`, or the relative path with `/` → `_`.
    pub id: String,
    /// Directory relative to the routes root (`""` for the root).
    pub route_path: String,
    /// Absolute directory path.
    pub directory_path: PathBuf,
    pub page_module: Option<ComponentModule>,
    /// Layout defined in this directory.
    pub layout_module: Option<ComponentModule>,
    /// Layout in effect for this node (own or nearest ancestor's).
    pub effective_layout: Option<ComponentModule>,
    pub handler_module: Option<HandlerBinding>,
    /// Server pattern relative to the mount point.
    pub url_pattern: String,
    /// Client pattern (absolute).
    pub route_pattern: String,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    pub fn is_catchall(&self) -> bool {
        self.id == CATCHALL_ID
    }

    /// The handler registry, when the node has a handler module.
    pub fn registry(&self) -> Option<&Arc<HandlerRegistry>> {
        self.handler_module.as_ref().map(|b| &b.registry)
    }

    /// Whether the node can answer any request.
    pub fn is_routable(&self) -> bool {
        self.page_module.is_some() || self.handler_module.is_some()
    }

    pub fn directory(&self) -> &Path {
        &self.directory_path
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk(&self) -> Vec<&RouteNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }

    /// Find a node by id in this subtree.
    pub fn find(&self, id: &str) -> Option<&RouteNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Node id for a route path.
pub fn node_id(route_path: &str) -> String {
    match route_path {
        "" => ROOT_ID.to_string(),
        CATCHALL_ID => CATCHALL_ID.to_string(),
        path => path.replace('/', "_"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids() {
        assert_eq!(node_id(""), "$root");
        assert_eq!(node_id("catchall"), "catchall");
        assert_eq!(node_id("blog/_slug"), "blog__slug");
    }

    #[test]
    fn test_component_import_path() {
        let root = ComponentModule::new(PathBuf::from("/r/page.tsx"), "", "page");
        assert_eq!(root.import_path, "page");
        let nested = ComponentModule::new(PathBuf::from("/r/docs/layout.tsx"), "docs", "layout");
        assert_eq!(nested.import_path, "docs/layout");
    }
}
