//! Per-node handler registry.
//!
//! # Responsibilities
//! - Collect one handler per (method, subpath) from a handler module
//! - Reject duplicates and invalid loader designations
//! - Pick the loader (explicit, else the root `get` handler)
//! - Synthesize `head` from the root `get` handler
//! - Apply ambient cache defaults
//!
//! # Design Decisions
//! - Built once per tree build, immutable afterwards
//! - Every violation is a `ConfigurationError`; nothing is fixed up silently

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::handler::{CacheConfig, Handler};
use super::method::Method;
use super::module::{HandlerModule, ModuleEntry};
use crate::error::ConfigurationError;

/// Handlers of one node, keyed by method then subpath.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    module: String,
    handlers: BTreeMap<Method, BTreeMap<String, Arc<Handler>>>,
    loader: Option<Arc<Handler>>,
}

impl HandlerRegistry {
    /// Build the registry for `module`.
    pub fn build(module: &HandlerModule, defaults: &CacheConfig) -> Result<Self, ConfigurationError> {
        let module_name = module.name().to_string();
        let mut handlers: BTreeMap<Method, BTreeMap<String, Arc<Handler>>> = BTreeMap::new();
        let mut loader: Option<Arc<Handler>> = None;

        for (name, entry) in module.entries() {
            let handler = match entry {
                ModuleEntry::Handler(handler) => handler.clone().with_default_cache(defaults),
                // Only exact lowercase method names are bare handlers.
                ModuleEntry::Function(implementation) => match Method::ALL.iter().copied().find(|m| m.as_str() == name) {
                    Some(method) => {
                        let handler = Handler::for_method(method, Arc::clone(implementation));
                        if method == Method::Get {
                            handler.with_default_cache(defaults)
                        } else {
                            handler
                        }
                    }
                    None => {
                        tracing::trace!(module = %module_name, name, "Skipping non-handler entry");
                        continue;
                    }
                },
            };

            if handler.is_loader() {
                if handler.method() != Method::Get {
                    return Err(ConfigurationError::InvalidLoader {
                        name: handler.name().to_string(),
                        method: handler.method().to_string(),
                    });
                }
                if loader.is_some() {
                    return Err(ConfigurationError::MultipleLoaders(module_name));
                }
            }

            let method_handlers = handlers.entry(handler.method()).or_default();
            if method_handlers.contains_key(handler.subpath()) {
                return Err(ConfigurationError::DuplicateHandler {
                    module: module_name,
                    method: handler.method().to_string(),
                    subpath: handler.subpath().to_string(),
                });
            }

            let handler = Arc::new(handler);
            if handler.is_loader() {
                loader = Some(Arc::clone(&handler));
            }
            method_handlers.insert(handler.subpath().to_string(), handler);
        }

        if handlers.is_empty() {
            return Err(ConfigurationError::EmptyHandlerModule(module_name));
        }

        let root_get = handlers
            .get(&Method::Get)
            .and_then(|m| m.get(""))
            .cloned();

        if let Some(root_get) = root_get {
            if loader.is_none() {
                let promoted = Arc::new(root_get.as_ref().clone().into_loader());
                handlers
                    .entry(Method::Get)
                    .or_default()
                    .insert(String::new(), Arc::clone(&promoted));
                loader = Some(promoted);
            }

            if !handlers.contains_key(&Method::Head) {
                handlers
                    .entry(Method::Head)
                    .or_default()
                    .insert(String::new(), Arc::new(root_get.alias(Method::Head)));
            }
        }

        tracing::debug!(
            module = %module_name,
            handlers = handlers.values().map(BTreeMap::len).sum::<usize>(),
            loader = loader.as_ref().map(|l| l.name()),
            "Handler registry built"
        );

        Ok(Self {
            module: module_name,
            handlers,
            loader,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Look up the handler for `method` at `subpath`.
    pub fn get(&self, method: Method, subpath: &str) -> Option<&Arc<Handler>> {
        self.handlers.get(&method).and_then(|m| m.get(subpath))
    }

    pub fn has_method(&self, method: Method) -> bool {
        self.handlers.contains_key(&method)
    }

    /// Methods with at least one handler, in `Method::ALL` order.
    pub fn methods(&self) -> Vec<Method> {
        self.handlers.keys().copied().collect()
    }

    pub fn loader(&self) -> Option<&Arc<Handler>> {
        self.loader.as_ref()
    }

    /// Distinct non-empty subpaths over all methods.
    pub fn subpaths(&self) -> BTreeSet<&str> {
        self.handlers
            .values()
            .flat_map(|m| m.keys())
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// All handlers, method first then subpath.
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<Handler>> {
        self.handlers.values().flat_map(|m| m.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerConfig, Reply};

    fn defaults() -> CacheConfig {
        CacheConfig {
            cache_time: Some(30),
            ..CacheConfig::default()
        }
    }

    #[test]
    fn test_bare_method_functions() {
        let module = HandlerModule::new("todos")
            .function("get", |_| Reply::none())
            .function("post", |_| Reply::none())
            .function("helper", |_| Reply::none());

        let registry = HandlerRegistry::build(&module, &defaults()).unwrap();
        assert_eq!(registry.methods(), vec![Method::Get, Method::Head, Method::Post]);
        assert_eq!(registry.get(Method::Get, "").unwrap().cache_time(), Some(30));
        assert!(registry.get(Method::Post, "").unwrap().cache().is_none());
    }

    #[test]
    fn test_method_names_are_case_sensitive() {
        let module = HandlerModule::new("todos").function("GET", |_| Reply::none());
        let err = HandlerRegistry::build(&module, &defaults()).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyHandlerModule(name) if name == "todos"));

        let module = HandlerModule::new("todos")
            .function("Post", |_| Reply::none())
            .function("get", |_| Reply::none());
        let registry = HandlerRegistry::build(&module, &defaults()).unwrap();
        assert!(registry.get(Method::Post, "").is_none());
    }

    #[test]
    fn test_root_get_becomes_loader_and_head() {
        let module = HandlerModule::new("blog").function("get", |_| Reply::none());
        let registry = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap();

        let loader = registry.loader().unwrap();
        assert_eq!(loader.method(), Method::Get);
        assert_eq!(loader.subpath(), "");
        assert!(registry.get(Method::Get, "").unwrap().is_loader());

        let head = registry.get(Method::Head, "").unwrap();
        assert!(!head.is_loader());
    }

    #[test]
    fn test_explicit_head_is_kept() {
        let module = HandlerModule::new("blog")
            .function("get", |_| Reply::none())
            .function("head", |_| Reply::from(418u16));
        let registry = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap();
        assert_eq!(registry.get(Method::Head, "").unwrap().name(), "head");
    }

    #[test]
    fn test_explicit_loader_wins() {
        let data = Handler::new("data", HandlerConfig::get().loader(), |_| Reply::none()).unwrap();
        let module = HandlerModule::new("docs")
            .function("get", |_| Reply::none())
            .handler(data);
        let registry = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap();

        assert_eq!(registry.loader().unwrap().subpath(), "data");
        assert!(!registry.get(Method::Get, "").unwrap().is_loader());
    }

    #[test]
    fn test_duplicate_get_is_rejected() {
        let module = HandlerModule::new("blog")
            .function("get", |_| Reply::none())
            .handler(Handler::new("get", HandlerConfig::get(), |_| Reply::none()).unwrap());

        let err = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::DuplicateHandler { ref method, ref subpath, .. }
                if method == "get" && subpath.is_empty()
        ));
    }

    #[test]
    fn test_multiple_loaders_are_rejected() {
        let a = Handler::new("a", HandlerConfig::get().loader(), |_| Reply::none()).unwrap();
        let b = Handler::new("b", HandlerConfig::get().loader(), |_| Reply::none()).unwrap();
        let module = HandlerModule::new("docs").handler(a).handler(b);

        let err = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MultipleLoaders(_)));
    }

    #[test]
    fn test_empty_module_is_rejected() {
        let module = HandlerModule::new("empty").function("helper", |_| Reply::none());
        let err = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyHandlerModule(_)));
    }

    #[test]
    fn test_subpaths() {
        let stuff = Handler::new("stuff", HandlerConfig::get().cache_time(5), |_| Reply::none()).unwrap();
        let things = Handler::new("things", HandlerConfig::get(), |_| Reply::none()).unwrap();
        let module = HandlerModule::new("root")
            .function("get", |_| Reply::none())
            .handler(stuff)
            .handler(things);

        let registry = HandlerRegistry::build(&module, &CacheConfig::default()).unwrap();
        let subpaths: Vec<&str> = registry.subpaths().into_iter().collect();
        assert_eq!(subpaths, vec!["stuff", "things"]);
        assert_eq!(registry.get(Method::Get, "stuff").unwrap().cache_time(), Some(5));
    }
}
