//! Handler modules and how route directories resolve them.
//!
//! A handler module is an explicit table of named entries. An entry is
//! either a bare function (registered as a handler only when its name is
//! an HTTP method) or an already configured [`Handler`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::handler::{Handler, HandlerFn};
use super::reply::Reply;
use crate::dispatch::RouteRequest;

/// One named entry of a handler module.
#[derive(Clone)]
pub enum ModuleEntry {
    Function(HandlerFn),
    Handler(Handler),
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleEntry::Function(_) => f.write_str("Function"),
            ModuleEntry::Handler(h) => f.debug_tuple("Handler").field(h).finish(),
        }
    }
}

/// Named callables contributed by one route directory.
#[derive(Debug, Clone)]
pub struct HandlerModule {
    name: String,
    entries: Vec<(String, ModuleEntry)>,
}

impl HandlerModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a bare function entry.
    pub fn function<F>(mut self, name: &str, implementation: F) -> Self
    where
        F: Fn(&RouteRequest) -> Reply + Send + Sync + 'static,
    {
        self.entries
            .push((name.to_string(), ModuleEntry::Function(Arc::new(implementation))));
        self
    }

    /// Add an explicitly configured handler.
    pub fn handler(mut self, handler: Handler) -> Self {
        self.entries
            .push((handler.name().to_string(), ModuleEntry::Handler(handler)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ModuleEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves the handler module for a route directory.
///
/// `route_path` is the directory relative to the routes root in POSIX
/// form, `""` for the root itself.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, route_path: &str) -> Option<Arc<HandlerModule>>;

    /// Every route path this loader knows about.
    fn route_paths(&self) -> Vec<String>;
}

/// A loader over modules registered up front.
#[derive(Debug, Clone, Default)]
pub struct StaticModules {
    modules: HashMap<String, Arc<HandlerModule>>,
}

impl StaticModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` for the directory at `route_path`.
    pub fn register(mut self, route_path: &str, module: HandlerModule) -> Self {
        self.modules
            .insert(normalize_route_path(route_path), Arc::new(module));
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for StaticModules {
    fn load(&self, route_path: &str) -> Option<Arc<HandlerModule>> {
        self.modules.get(&normalize_route_path(route_path)).cloned()
    }

    fn route_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.keys().cloned().collect();
        paths.sort();
        paths
    }
}

/// `"."`, `"/"` and `""` all name the root.
pub fn normalize_route_path(route_path: &str) -> String {
    let trimmed = route_path.trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_aliases() {
        let modules = StaticModules::new()
            .register(".", HandlerModule::new("root").function("get", |_| Reply::none()));
        assert!(modules.load("").is_some());
        assert!(modules.load("/").is_some());
        assert!(modules.load("blog").is_none());
    }

    #[test]
    fn test_entries_keep_definition_order() {
        let module = HandlerModule::new("blog")
            .function("post", |_| Reply::none())
            .function("get", |_| Reply::none());
        let names: Vec<&str> = module.entries().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["post", "get"]);
    }
}
