//! Route tree construction from the routes directory.
//!
//! # Responsibilities
//! - Walk the routes directory depth-first
//! - Detect page and layout components (`.tsx` / `.jsx`)
//! - Bind handler modules through a [`ModuleLoader`]
//! - Require a root layout, propagate layouts to descendants
//! - Skip `__`-prefixed helper directories
//!
//! Children are ordered by URL precedence so that a build from identical
//! file-system state always yields the same node order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::node::{node_id, ComponentModule, HandlerBinding, RouteNode, CATCHALL_ID};
use super::pattern::translate;
use super::precedence::PrecedenceKey;
use crate::error::ConfigurationError;
use crate::handlers::{CacheConfig, HandlerRegistry, ModuleLoader};

/// Server pattern of the catchall node. Matches every path.
pub const CATCHALL_PATTERN: &str = ".*";

/// Client pattern of the catchall node.
pub const CATCHALL_ROUTE_PATTERN: &str = "/*";

/// Default handler module file name.
pub const DEFAULT_HANDLER_FILE: &str = "handlers.rs";

const HIDDEN_PREFIX: &str = "__";
const COMPONENT_EXTENSIONS: [&str; 2] = ["tsx", "jsx"];

/// Builds the [`RouteNode`] tree for a routes directory.
pub struct RouteTreeBuilder<'a> {
    routes_dir: PathBuf,
    handler_file: String,
    cache_defaults: CacheConfig,
    modules: &'a dyn ModuleLoader,
}

impl<'a> RouteTreeBuilder<'a> {
    pub fn new(routes_dir: impl Into<PathBuf>, modules: &'a dyn ModuleLoader) -> Self {
        Self {
            routes_dir: routes_dir.into(),
            handler_file: DEFAULT_HANDLER_FILE.to_string(),
            cache_defaults: CacheConfig::default(),
            modules,
        }
    }

    /// File name that marks a directory as having handlers.
    pub fn handler_file(mut self, name: impl Into<String>) -> Self {
        self.handler_file = name.into();
        self
    }

    /// Ambient cache options applied to `get` handlers without their own.
    pub fn cache_defaults(mut self, defaults: CacheConfig) -> Self {
        self.cache_defaults = defaults;
        self
    }

    pub fn routes_dir(&self) -> &Path {
        &self.routes_dir
    }

    /// Build the tree. Any configuration problem aborts the whole build.
    pub fn build(&self) -> Result<RouteNode, ConfigurationError> {
        if !self.routes_dir.is_dir() {
            return Err(ConfigurationError::MissingRoutesDir(self.routes_dir.clone()));
        }

        let mut used = BTreeSet::new();
        let root = self.build_node(&self.routes_dir, "", None, &mut used)?;

        for route_path in self.modules.route_paths() {
            if !used.contains(&route_path) {
                tracing::warn!(
                    route_path = %route_path,
                    handler_file = %self.handler_file,
                    "Handler module registered but no matching handler file in routes directory"
                );
            }
        }

        let nodes = root.walk();
        let mut ids: BTreeMap<&str, &str> = BTreeMap::new();
        for node in &nodes {
            if let Some(first) = ids.insert(&node.id, &node.route_path) {
                return Err(ConfigurationError::DuplicateNodeId {
                    id: node.id.clone(),
                    first: first.to_string(),
                    second: node.route_path.clone(),
                });
            }
        }

        tracing::info!(
            routes_dir = %self.routes_dir.display(),
            nodes = nodes.len(),
            pages = nodes.iter().filter(|n| n.page_module.is_some()).count(),
            handler_modules = used.len(),
            "Route tree built"
        );

        Ok(root)
    }

    fn build_node(
        &self,
        dir: &Path,
        route_path: &str,
        inherited_layout: Option<&ComponentModule>,
        used: &mut BTreeSet<String>,
    ) -> Result<RouteNode, ConfigurationError> {
        let layout_module = find_component(dir, route_path, "layout")?;
        if route_path.is_empty() && layout_module.is_none() {
            return Err(ConfigurationError::MissingRootLayout(dir.to_path_buf()));
        }
        let effective_layout = layout_module.clone().or_else(|| inherited_layout.cloned());

        let page_module = find_component(dir, route_path, "page")?;
        let handler_module = self.bind_handlers(dir, route_path, used)?;

        let (url_pattern, route_pattern) = if route_path == CATCHALL_ID {
            (CATCHALL_PATTERN.to_string(), CATCHALL_ROUTE_PATTERN.to_string())
        } else {
            let patterns = translate(route_path)?;
            (patterns.url_pattern, patterns.route_pattern)
        };

        let mut children = Vec::new();
        for (name, path) in subdirectories(dir)? {
            let child_route_path = if route_path.is_empty() {
                name
            } else {
                format!("{}/{}", route_path, name)
            };
            children.push(self.build_node(&path, &child_route_path, effective_layout.as_ref(), used)?);
        }
        children.sort_by_cached_key(|c| PrecedenceKey::new(&c.url_pattern, c.is_catchall()));

        let id = node_id(route_path);
        tracing::trace!(
            id = %id,
            page = page_module.is_some(),
            layout = layout_module.is_some(),
            handlers = handler_module.is_some(),
            "Route node"
        );

        Ok(RouteNode {
            id,
            route_path: route_path.to_string(),
            directory_path: dir.to_path_buf(),
            page_module,
            layout_module,
            effective_layout,
            handler_module,
            url_pattern,
            route_pattern,
            children,
        })
    }

    fn bind_handlers(
        &self,
        dir: &Path,
        route_path: &str,
        used: &mut BTreeSet<String>,
    ) -> Result<Option<HandlerBinding>, ConfigurationError> {
        let path = dir.join(&self.handler_file);
        if !path.is_file() {
            return Ok(None);
        }

        let module = self
            .modules
            .load(route_path)
            .ok_or_else(|| ConfigurationError::UnresolvedHandlerModule(route_path.to_string()))?;
        let registry = HandlerRegistry::build(&module, &self.cache_defaults)?;
        used.insert(route_path.to_string());

        Ok(Some(HandlerBinding {
            path,
            module,
            registry: Arc::new(registry),
        }))
    }
}

/// Find `<stem>.tsx` or `<stem>.jsx` in `dir`. Both present is an error.
fn find_component(
    dir: &Path,
    route_path: &str,
    stem: &'static str,
) -> Result<Option<ComponentModule>, ConfigurationError> {
    let found: Vec<PathBuf> = COMPONENT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .filter(|p| p.is_file())
        .collect();

    match found.as_slice() {
        [] => Ok(None),
        [path] => Ok(Some(ComponentModule::new(path.clone(), route_path, stem))),
        _ => Err(ConfigurationError::AmbiguousModule {
            kind: stem,
            dir: dir.to_path_buf(),
        }),
    }
}

/// Route subdirectories of `dir`, sorted by name.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, ConfigurationError> {
    let io_err = |source| ConfigurationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 directory name");
            continue;
        };
        if name.starts_with(HIDDEN_PREFIX) || name.starts_with('.') {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort();
    Ok(dirs)
}
