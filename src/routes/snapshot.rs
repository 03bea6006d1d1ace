//! Immutable route snapshots behind a single swappable handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

use super::builder::{RouteTreeBuilder, DEFAULT_HANDLER_FILE};
use super::client::{client_routes, ClientRoute};
use super::node::RouteNode;
use super::table::{RouteMatch, UrlTable};
use crate::error::ConfigurationError;
use crate::handlers::{CacheConfig, ModuleLoader};

/// Owned inputs for repeated tree builds.
#[derive(Clone)]
pub struct RouteSource {
    routes_dir: PathBuf,
    handler_file: String,
    cache_defaults: CacheConfig,
    modules: Arc<dyn ModuleLoader>,
}

impl RouteSource {
    pub fn new(routes_dir: impl Into<PathBuf>, modules: Arc<dyn ModuleLoader>) -> Self {
        Self {
            routes_dir: routes_dir.into(),
            handler_file: DEFAULT_HANDLER_FILE.to_string(),
            cache_defaults: CacheConfig::default(),
            modules,
        }
    }

    pub fn handler_file(mut self, name: impl Into<String>) -> Self {
        self.handler_file = name.into();
        self
    }

    pub fn cache_defaults(mut self, defaults: CacheConfig) -> Self {
        self.cache_defaults = defaults;
        self
    }

    pub fn routes_dir(&self) -> &Path {
        &self.routes_dir
    }

    pub fn builder(&self) -> RouteTreeBuilder<'_> {
        RouteTreeBuilder::new(&self.routes_dir, self.modules.as_ref())
            .handler_file(&self.handler_file)
            .cache_defaults(self.cache_defaults.clone())
    }

    pub fn build(&self) -> Result<RouteSnapshot, ConfigurationError> {
        RouteSnapshot::build(&self.builder())
    }
}

/// Everything produced by one tree build.
#[derive(Debug)]
pub struct RouteSnapshot {
    pub root: RouteNode,
    pub table: UrlTable,
    pub client: Option<ClientRoute>,
    pub built_at: DateTime<Utc>,
    /// Incremented each time a snapshot is swapped in.
    pub generation: u64,
}

impl RouteSnapshot {
    pub fn build(builder: &RouteTreeBuilder<'_>) -> Result<Self, ConfigurationError> {
        let root = builder.build()?;
        Ok(Self::from_tree(root))
    }

    pub fn from_tree(root: RouteNode) -> Self {
        let table = UrlTable::from_tree(&root);
        let client = client_routes(&root);
        Self {
            root,
            table,
            client,
            built_at: Utc::now(),
            generation: 0,
        }
    }
}

/// The active route snapshot.
///
/// Readers get an `Arc` to a complete snapshot; a rebuild replaces it with
/// one atomic store, so in-flight requests keep the tree they started with.
pub struct RouteTable {
    current: ArcSwap<RouteSnapshot>,
}

impl RouteTable {
    pub fn new(snapshot: RouteSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn load(&self) -> Arc<RouteSnapshot> {
        self.current.load_full()
    }

    /// Swap in `snapshot`, returning its generation.
    pub fn replace(&self, mut snapshot: RouteSnapshot) -> u64 {
        snapshot.generation = self.current.load().generation + 1;
        let generation = snapshot.generation;
        self.current.store(Arc::new(snapshot));
        tracing::info!(generation, "Route table swapped");
        generation
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.current.load().table.resolve(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerModule, Reply, StaticModules};
    use std::fs;

    #[test]
    fn test_replace_bumps_generation_and_keeps_old_readers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("layout.tsx"), "").unwrap();
        fs::write(dir.path().join("page.tsx"), "").unwrap();

        let modules = StaticModules::new();
        let builder = RouteTreeBuilder::new(dir.path(), &modules);
        let table = RouteTable::new(RouteSnapshot::build(&builder).unwrap());

        let before = table.load();
        assert_eq!(before.generation, 0);
        assert!(table.resolve("about").is_none());

        fs::create_dir(dir.path().join("about")).unwrap();
        fs::write(dir.path().join("about/handlers.rs"), "").unwrap();
        let modules = StaticModules::new()
            .register("about", HandlerModule::new("about").function("get", |_| Reply::from("hi")));
        let builder = RouteTreeBuilder::new(dir.path(), &modules);

        assert_eq!(table.replace(RouteSnapshot::build(&builder).unwrap()), 1);
        assert!(table.resolve("about").is_some());
        assert!(before.table.resolve("about").is_none());
    }
}
