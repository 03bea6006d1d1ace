//! Ordered startup of a site.
//!
//! Config is already loaded and validated by the caller. From there:
//! build the route tree (fatal on error), bind the listener, start the
//! optional routes watcher, serve until shutdown.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use super::shutdown::Shutdown;
use crate::config::SiteConfig;
use crate::error::ConfigurationError;
use crate::handlers::ModuleLoader;
use crate::http::HttpServer;
use crate::routes::{RouteSource, RouteWatcher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Routes(#[from] ConfigurationError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to watch routes directory: {0}")]
    Watch(#[from] notify::Error),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

/// The route source described by `config`.
pub fn route_source(config: &SiteConfig, modules: Arc<dyn ModuleLoader>) -> RouteSource {
    RouteSource::new(&config.site.routes_dir, modules)
        .handler_file(&config.site.handler_file)
        .cache_defaults(config.cache.clone())
}

/// Build routes and serve `config` until `shutdown` fires.
///
/// With `watch` set, edits under the routes directory rebuild the route
/// table in place; a failed rebuild keeps the previous table.
pub async fn serve(
    config: SiteConfig,
    modules: Arc<dyn ModuleLoader>,
    watch: bool,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let source = route_source(&config, modules);
    let snapshot = source.build()?;

    let address = config.server.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let (updates, _watcher) = if watch {
        let debounce = Duration::from_millis(config.dev.debounce_ms);
        let (watcher, updates) = RouteWatcher::new(source, debounce);
        let handle = watcher.run(shutdown.subscribe())?;
        (Some(updates), Some(handle))
    } else {
        (None, None)
    };

    HttpServer::new(config, snapshot)
        .run(listener, updates, shutdown.subscribe())
        .await
        .map_err(StartupError::Server)
}
