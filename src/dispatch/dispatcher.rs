//! Per-request dispatch to a route's page or handlers.
//!
//! Decision table for a matched route:
//! 1. GET/HEAD at the node itself, HTML preferred (or no handler for the
//!    method), node has a page: render the page with the loader's data
//! 2. No handler for the method: OPTIONS lists allowed methods, else 405
//! 3. Handler lookup by (method, subpath); unknown subpath is a 404
//! 4. Invoke, coerce, apply cache policy

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use super::cache_policy::{apply_cache_policy, patch_vary};
use super::coerce::{coerce, Coerced};
use super::error_page::error_response;
use super::page::{PageContext, PageRenderer, SiteMeta};
use super::request::RouteRequest;
use crate::cache::{self, CacheStore};
use crate::error::DispatchError;
use crate::handlers::{CacheConfig, Handler, HandlerRegistry, Method};
use crate::observability::metrics;
use crate::routes::{RouteMatch, RouteView};

/// Dispatches matched requests. Shared by all requests.
pub struct Dispatcher {
    renderer: Arc<dyn PageRenderer>,
    cache: Option<Arc<dyn CacheStore>>,
    page_cache: CacheConfig,
    site: SiteMeta,
}

impl Dispatcher {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            renderer,
            cache: None,
            page_cache: CacheConfig::default(),
            site: SiteMeta::default(),
        }
    }

    /// Shared store for whole-response caching.
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Cache options for pages without a loader of their own.
    pub fn with_page_cache(mut self, config: CacheConfig) -> Self {
        self.page_cache = config;
        self
    }

    pub fn with_site(mut self, site: SiteMeta) -> Self {
        self.site = site;
        self
    }

    pub async fn dispatch(&self, request: &RouteRequest, route: &RouteMatch) -> Result<Response, DispatchError> {
        let view = route.view.as_ref();
        let Some(method) = Method::from_http(&request.method) else {
            return Ok(method_not_allowed(request, view));
        };

        let registry = view.registry.as_deref();
        let has_handler = registry.is_some_and(|r| r.has_method(method));

        tracing::debug!(
            node = %view.node_id,
            method = %method,
            subpath = %route.subpath,
            prefers_json = request.prefers_json,
            "Dispatching request"
        );

        if method.is_safe() && route.subpath.is_empty() && (!request.prefers_json || !has_handler) {
            if let Some(page) = &view.page {
                let loader = registry.and_then(HandlerRegistry::loader);
                let cache = loader.and_then(|l| l.cache()).unwrap_or(&self.page_cache);
                return self
                    .cached(request, method, cache, || self.render_page(request, view, page, loader, method))
                    .await;
            }
        }

        let handler = match registry {
            Some(registry) if has_handler => registry.get(method, &route.subpath),
            _ if method == Method::Options => return Ok(options_response(view)),
            _ => return Ok(method_not_allowed(request, view)),
        };

        let Some(handler) = handler else {
            tracing::error!(
                node = %view.node_id,
                method = %method,
                subpath = %route.subpath,
                "URL matched route but no handler is registered for subpath"
            );
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                &format!("No {} handler for {}", method.as_str().to_uppercase(), request.path),
                request.prefers_json,
            ));
        };

        let cache = handler.cache();
        let empty = CacheConfig {
            vary_on: Vec::new(),
            ..CacheConfig::default()
        };
        self.cached(request, method, cache.unwrap_or(&empty), || {
            self.call_handler(request, view, handler, method)
        })
        .await
    }

    /// Serve from the shared cache when the request is cacheable, else
    /// produce the response and store it.
    async fn cached<F, Fut>(
        &self,
        request: &RouteRequest,
        method: Method,
        cache: &CacheConfig,
        produce: F,
    ) -> Result<Response, DispatchError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Response, DispatchError>>,
    {
        let Some(store) = self.cache.as_deref() else {
            return produce().await;
        };
        let cacheable = method.is_safe() && !request.is_authenticated() && !cache.is_private();
        let Some(seconds) = cache.cache_time.filter(|_| cacheable) else {
            return produce().await;
        };
        let ttl = Duration::from_secs(u64::from(seconds));

        let key = cache::cache_key(request, &cache.vary_on);
        if let Some(response) = cache::response::load(store, &key) {
            tracing::debug!(key = %key, "Response cache hit");
            metrics::record_cache_lookup(true);
            return Ok(response);
        }
        metrics::record_cache_lookup(false);

        let mut response = produce().await?;
        // Entries are keyed per representation.
        patch_vary(response.headers_mut(), &["Accept".to_string()]);
        if response.status() == StatusCode::OK {
            Ok(cache::response::store(store, &key, response, ttl).await)
        } else {
            Ok(response)
        }
    }

    async fn call_handler(
        &self,
        request: &RouteRequest,
        view: &RouteView,
        handler: &Handler,
        method: Method,
    ) -> Result<Response, DispatchError> {
        let reply = handler.call(request);
        let coerced = coerce(reply, request.prefers_json).map_err(|e| {
            DispatchError::coercion(&view.node_id, handler.method().as_str(), handler.subpath(), e)
        })?;

        let mut response = coerced.into_response();
        apply_cache_policy(&mut response, method, handler.cache(), request.is_authenticated());
        Ok(response)
    }

    async fn render_page(
        &self,
        request: &RouteRequest,
        view: &RouteView,
        page: &crate::routes::ComponentModule,
        loader: Option<&Arc<Handler>>,
        method: Method,
    ) -> Result<Response, DispatchError> {
        let (data, status) = match loader {
            Some(loader) => {
                let reply = loader.call(request);
                let coerced = coerce(reply, request.prefers_json).map_err(|e| {
                    DispatchError::coercion(&view.node_id, loader.method().as_str(), loader.subpath(), e)
                })?;
                match coerced {
                    Coerced::Json { status, body } => (body, status),
                    Coerced::Text { status, body } => (serde_json::Value::String(body), status),
                    Coerced::Empty { status } => (serde_json::Value::Null, status),
                    redirect @ Coerced::Redirect { .. } => return Ok(redirect.into_response()),
                    Coerced::Response(response) => return Ok(response),
                }
            }
            None => (serde_json::Value::Null, StatusCode::OK),
        };

        let context = PageContext {
            node_id: &view.node_id,
            page,
            layout: view.layout.as_ref(),
            path: &request.path,
            site: &self.site,
            principal: request.principal.as_ref(),
            data: &data,
        };
        let html = self.renderer.render(&context).map_err(|e| DispatchError::Render {
            node: view.node_id.clone(),
            message: e.to_string(),
        })?;

        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::OK
        };
        let mut response = Coerced::Text { status, body: html }.into_response();

        let cache = loader.and_then(|l| l.cache()).unwrap_or(&self.page_cache);
        apply_cache_policy(&mut response, method, Some(cache), request.is_authenticated());
        Ok(response)
    }
}

/// Methods a node answers, for `Allow`.
pub fn allowed_methods(view: &RouteView) -> Vec<Method> {
    let mut methods: Vec<Method> = view
        .registry
        .as_ref()
        .map(|r| r.methods())
        .unwrap_or_default();
    if view.page.is_some() {
        methods.extend([Method::Get, Method::Head]);
    }
    methods.push(Method::Options);
    methods.sort();
    methods.dedup();
    methods
}

fn allow_header(view: &RouteView) -> Option<HeaderValue> {
    let allow = allowed_methods(view)
        .iter()
        .map(|m| m.as_str().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&allow).ok()
}

fn options_response(view: &RouteView) -> Response {
    let mut response = Response::new(axum::body::Body::empty());
    if let Some(allow) = allow_header(view) {
        response.headers_mut().insert(header::ALLOW, allow);
    }
    response
}

fn method_not_allowed(request: &RouteRequest, view: &RouteView) -> Response {
    tracing::debug!(node = %view.node_id, method = %request.method, "Method not allowed");
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &format!("Method not allowed: {}", request.method),
        request.prefers_json,
    );
    if let Some(allow) = allow_header(view) {
        response.headers_mut().insert(header::ALLOW, allow);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::dispatch::page::ShellRenderer;
    use crate::dispatch::Principal;
    use crate::handlers::{HandlerConfig, HandlerModule, Reply};
    use crate::routes::ComponentModule;
    use axum::http::Method as HttpMethod;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn view(page: bool, module: Option<HandlerModule>) -> Arc<RouteView> {
        let registry = module.map(|m| Arc::new(HandlerRegistry::build(&m, &CacheConfig::default()).unwrap()));
        Arc::new(RouteView {
            node_id: "things".to_string(),
            url_pattern: "things".to_string(),
            route_pattern: "/things".to_string(),
            page: page.then(|| ComponentModule {
                path: PathBuf::from("/routes/things/page.tsx"),
                import_path: "things/page".to_string(),
            }),
            layout: None,
            registry,
            catchall: false,
        })
    }

    fn matched(view: Arc<RouteView>, subpath: &str) -> RouteMatch {
        RouteMatch {
            view,
            subpath: subpath.to_string(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    fn request(method: HttpMethod, prefers_json: bool) -> RouteRequest {
        let mut request = RouteRequest::new(method, "/things");
        request.prefers_json = prefers_json;
        request
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(ShellRenderer))
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn things_module() -> HandlerModule {
        HandlerModule::new("things")
            .function("get", |_| serde_json::json!({"slug": "things"}).into())
            .function("post", |_| Reply::with_status(201, serde_json::json!({"created": true})))
    }

    #[tokio::test]
    async fn test_html_renders_page_with_loader_data() {
        let route = matched(view(true, Some(things_module())), "");
        let response = dispatcher().dispatch(&request(HttpMethod::GET, false), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body(response).await;
        assert!(html.contains(r#"{"slug":"things"}"#));
    }

    #[tokio::test]
    async fn test_json_calls_handler() {
        let route = matched(view(true, Some(things_module())), "");
        let response = dispatcher().dispatch(&request(HttpMethod::GET, true), &route).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body(response).await, r#"{"slug":"things"}"#);
    }

    #[tokio::test]
    async fn test_page_without_handlers_serves_json_requests_too() {
        let route = matched(view(true, None), "");
        let response = dispatcher().dispatch(&request(HttpMethod::GET, true), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_loader_error_status_carries_to_page() {
        let module = HandlerModule::new("things").function("get", |_| (404u16, serde_json::json!({"detail": "gone"})).into());
        let route = matched(view(true, Some(module)), "");
        let response = dispatcher().dispatch(&request(HttpMethod::GET, false), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_loader_redirect_short_circuits() {
        let module = HandlerModule::new("things").function("get", |_| Reply::redirect("/login", false));
        let route = matched(view(true, Some(module)), "");
        let response = dispatcher().dispatch(&request(HttpMethod::GET, false), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_method_not_allowed_and_options() {
        let route = matched(view(false, Some(things_module())), "");

        let response = dispatcher().dispatch(&request(HttpMethod::DELETE, true), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, POST, OPTIONS");

        let response = dispatcher().dispatch(&request(HttpMethod::OPTIONS, true), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_post_status_and_data() {
        let route = matched(view(true, Some(things_module())), "");
        let response = dispatcher().dispatch(&request(HttpMethod::POST, false), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn test_unknown_subpath_is_not_found() {
        let route = matched(view(false, Some(things_module())), "missing");
        let response = dispatcher().dispatch(&request(HttpMethod::GET, true), &route).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_bug_is_dispatch_error() {
        let module = HandlerModule::new("things").function("get", |_| (200u16, 42i64).into());
        let route = matched(view(false, Some(module)), "");
        let err = dispatcher().dispatch(&request(HttpMethod::GET, true), &route).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler { ref node, .. } if node == "things"));
    }

    #[tokio::test]
    async fn test_response_cache_skips_handler_on_hit() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let handler = Handler::new("get", HandlerConfig::get().cache_time(10), |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            serde_json::json!({"n": 1}).into()
        })
        .unwrap();
        let route = matched(view(false, Some(HandlerModule::new("things").handler(handler))), "");
        let dispatcher = dispatcher().with_cache(Arc::new(MemoryStore::new()));

        for _ in 0..3 {
            let response = dispatcher.dispatch(&request(HttpMethod::GET, true), &route).await.unwrap();
            assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=10");
            assert_eq!(body(response).await, r#"{"n":1}"#);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        let authed = request(HttpMethod::GET, true).with_principal(Some(Principal::new("1")));
        let response = dispatcher.dispatch(&authed, &route).await.unwrap();
        assert_eq!(response.headers()[header::CACHE_CONTROL], "private");
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_response_cache_keeps_html_and_json_apart() {
        let handler = Handler::new("get", HandlerConfig::get().cache_time(10).vary_on(Vec::<String>::new()), |_| {
            serde_json::json!({"slug": "things"}).into()
        })
        .unwrap();
        let route = matched(view(true, Some(HandlerModule::new("things").handler(handler))), "");
        let dispatcher = dispatcher().with_cache(Arc::new(MemoryStore::new()));

        let html = dispatcher.dispatch(&request(HttpMethod::GET, false), &route).await.unwrap();
        assert!(html.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));

        let json = dispatcher.dispatch(&request(HttpMethod::GET, true), &route).await.unwrap();
        assert_eq!(json.headers()[header::CONTENT_TYPE], "application/json");
        assert!(json.headers()[header::VARY].to_str().unwrap().contains("Accept"));
        assert_eq!(body(json).await, r#"{"slug":"things"}"#);
    }

    #[tokio::test]
    async fn test_redirect_to_invalid_location_is_an_error() {
        let module = HandlerModule::new("things").function("post", |_| Reply::redirect("/a\nb", false));
        let route = matched(view(false, Some(module)), "");
        let result = dispatcher().dispatch(&request(HttpMethod::POST, true), &route).await;
        assert!(matches!(result, Err(DispatchError::Handler { .. })));
    }
}
