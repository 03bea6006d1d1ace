//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use serde_json::json;
use tempfile::TempDir;

use routekit::config::SiteConfig;
use routekit::handlers::{Handler, HandlerConfig, HandlerModule, Reply, StaticModules};
use routekit::lifecycle::route_source;
use routekit::routes::RouteSnapshot;

/// Create an empty file (and its parents) under `root`.
pub fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

/// A small site:
///
/// ```text
/// layout.tsx page.tsx
/// things/     page.tsx handlers.rs   get, post
/// blog/_slug/ page.tsx handlers.rs   get
/// api/        handlers.rs            get, stats
/// catchall/   page.tsx handlers.rs   get → 404
/// ```
pub fn site_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, "layout.tsx");
    touch(root, "page.tsx");
    touch(root, "things/page.tsx");
    touch(root, "things/handlers.rs");
    touch(root, "blog/_slug/page.tsx");
    touch(root, "blog/_slug/handlers.rs");
    touch(root, "api/handlers.rs");
    touch(root, "catchall/page.tsx");
    touch(root, "catchall/handlers.rs");
    dir
}

pub fn site_modules() -> StaticModules {
    let stats = Handler::new("stats", HandlerConfig::get(), |_| json!({"count": 3}).into()).unwrap();

    StaticModules::new()
        .register(
            "things",
            HandlerModule::new("things")
                .function("get", |_| json!({"slug": "things"}).into())
                .function("post", |request| {
                    let name = request.field("name").unwrap_or_default().to_string();
                    Reply::with_status(201, json!({"created": name}))
                }),
        )
        .register(
            "blog/_slug",
            HandlerModule::new("blog/_slug").function("get", |request| {
                json!({"slug": request.kwarg("slug"), "user": request.principal.as_ref().map(|p| p.id.clone())}).into()
            }),
        )
        .register(
            "api",
            HandlerModule::new("api")
                .function("get", |_| json!({"ok": true}).into())
                .handler(stats),
        )
        .register(
            "catchall",
            HandlerModule::new("catchall").function("get", |request| {
                Reply::with_status(404, json!({"path": request.arg(0)}))
            }),
        )
}

/// Config pointing at `dir`, with a 10 second default cache lifetime.
pub fn site_config(dir: &Path) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.site.routes_dir = dir.to_path_buf();
    config.cache.cache_time = Some(10);
    config
}

pub fn build_snapshot(config: &SiteConfig) -> RouteSnapshot {
    route_source(config, Arc::new(site_modules())).build().unwrap()
}

pub fn get(uri: &str, accept: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, accept)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
