//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the route dispatcher as fallback
//! - Wire up middleware (request ID, tracing, timeout, body limit, negotiation)
//! - Resolve request paths against the active route table
//! - Swap in rebuilt route tables while serving

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::MemoryStore;
use crate::config::SiteConfig;
use crate::dispatch::{error_response, Dispatcher, PageRenderer, Principal, RequestData, RouteRequest, ShellRenderer};
use crate::http::negotiate::{negotiate, prefers_json, Negotiation};
use crate::http::request::{make_span, request_id, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routes::{RouteSnapshot, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub dispatcher: Arc<Dispatcher>,
    /// Mount prefix, empty or ending with `/`.
    pub prefix: Arc<str>,
    pub debug: bool,
}

/// HTTP server for a routes directory.
pub struct HttpServer {
    config: SiteConfig,
    routes: Arc<RouteTable>,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a server serving `snapshot`, rendering pages as an app shell.
    pub fn new(config: SiteConfig, snapshot: RouteSnapshot) -> Self {
        let dispatcher = Self::make_dispatcher(&config, Arc::new(ShellRenderer));
        Self {
            config,
            routes: Arc::new(RouteTable::new(snapshot)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Use another page renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.dispatcher = Arc::new(Self::make_dispatcher(&self.config, renderer));
        self
    }

    fn make_dispatcher(config: &SiteConfig, renderer: Arc<dyn PageRenderer>) -> Dispatcher {
        Dispatcher::new(renderer)
            .with_cache(Arc::new(MemoryStore::new()))
            .with_page_cache(config.cache.clone())
            .with_site(config.site.meta())
    }

    /// The active route table handle.
    pub fn route_table(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let state = AppState {
            routes: Arc::clone(&self.routes),
            dispatcher: Arc::clone(&self.dispatcher),
            prefix: Arc::from(self.config.site.prefix.as_str()),
            debug: self.config.site.debug,
        };
        let negotiation = Arc::new(Negotiation {
            intercept_extensions: self.config.site.intercept_extensions(),
            max_body_size: self.config.server.max_body_size,
        });

        Router::new()
            .fallback(route_handler)
            .with_state(state)
            .layer(axum::middleware::from_fn_with_state(negotiation, negotiate))
            .layer(RequestBodyLimitLayer::new(self.config.server.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server on `listener` until `shutdown` fires. Snapshots from
    /// `route_updates` replace the active route table as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        route_updates: Option<mpsc::UnboundedReceiver<RouteSnapshot>>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let snapshot = self.routes.load();
        tracing::info!(
            address = %addr,
            prefix = %self.config.site.prefix,
            routes = snapshot.table.len(),
            "HTTP server starting"
        );

        if let Some(mut updates) = route_updates {
            let routes = Arc::clone(&self.routes);
            let mut stop = shutdown.resubscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop.recv() => break,
                        update = updates.recv() => match update {
                            Some(snapshot) => {
                                routes.replace(snapshot);
                            }
                            None => break,
                        },
                    }
                }
            });
        }

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolve the path in the active route table and dispatch.
async fn route_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();
    let prefers_json = prefers_json(&parts.headers);
    let path = parts.uri.path().to_string();
    let method = parts.method.clone();

    let Some(relative) = strip_prefix(&path, &state.prefix) else {
        metrics::record_request(method.as_str(), 404, "none", start);
        return error_response(StatusCode::NOT_FOUND, &format!("No route for {}", path), prefers_json);
    };

    let snapshot = state.routes.load();
    let Some(route) = snapshot.table.resolve(relative) else {
        tracing::debug!(path = %path, "No route matched");
        metrics::record_request(method.as_str(), 404, "none", start);
        return error_response(StatusCode::NOT_FOUND, &format!("No route for {}", path), prefers_json);
    };

    let request_id = request_id(&parts.headers).to_string();
    let mut route_request = RouteRequest::new(method.clone(), path.clone())
        .with_query(parts.uri.query().unwrap_or_default())
        .with_principal(parts.extensions.get::<Principal>().cloned());
    route_request.prefers_json = prefers_json;
    route_request.data = parts.extensions.get::<RequestData>().cloned();
    route_request.args = route.args.clone();
    route_request.kwargs = route.kwargs.clone();
    route_request.headers = parts.headers;

    let response = match state.dispatcher.dispatch(&route_request, &route).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                node = %route.view.node_id,
                path = %path,
                error = %e,
                "Request dispatch failed"
            );
            let detail = if state.debug {
                e.to_string()
            } else {
                "The server encountered an internal error".to_string()
            };
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &detail, prefers_json)
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), &route.view.node_id, start);
    response
}

/// Path relative to the mount prefix, or `None` outside it.
fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if prefix.is_empty() {
        return Some(path);
    }
    if path == prefix.trim_end_matches('/') {
        return Some("");
    }
    path.strip_prefix(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("/", ""), Some(""));
        assert_eq!(strip_prefix("/docs/x", ""), Some("docs/x"));
        assert_eq!(strip_prefix("/app/docs", "app/"), Some("docs"));
        assert_eq!(strip_prefix("/app", "app/"), Some(""));
        assert_eq!(strip_prefix("/other", "app/"), None);
    }
}
