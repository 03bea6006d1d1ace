//! Whole-response caching for anonymous GET/HEAD requests.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::store::CacheStore;
use crate::dispatch::RouteRequest;

/// A response as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn from_parts(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        Self {
            status: status.as_u16(),
            headers: headers
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
                .collect(),
            body: body.to_vec(),
        }
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                headers.append(name, value);
            }
        }
        response
    }
}

/// Cache key: method, negotiated representation, path with query, and the
/// varied-on header values.
pub fn cache_key(request: &RouteRequest, vary_on: &[String]) -> String {
    let representation = if request.prefers_json { "json" } else { "html" };
    let mut key = format!("routekit:{}:{}:{}", request.method, representation, request.path);
    if !request.query.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(request.query.iter())
            .finish();
        key.push('?');
        key.push_str(&query);
    }
    for name in vary_on {
        key.push('|');
        key.push_str(&name.to_ascii_lowercase());
        key.push('=');
        key.push_str(request.header(name).unwrap_or(""));
    }
    key
}

/// Look up a cached response.
pub fn load(store: &dyn CacheStore, key: &str) -> Option<Response> {
    let bytes = store.get(key)?;
    match serde_json::from_slice::<CachedResponse>(&bytes) {
        Ok(cached) => Some(cached.into_response()),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
            store.delete(key);
            None
        }
    }
}

/// Buffer `response`, store it under `key`, and hand back an equivalent response.
pub async fn store(store: &dyn CacheStore, key: &str, response: Response, ttl: Duration) -> Response {
    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(key, error = %e, "Failed to buffer response for caching");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let cached = CachedResponse::from_parts(parts.status, &parts.headers, &bytes);
    match serde_json::to_vec(&cached) {
        Ok(encoded) => store.set(key, Bytes::from(encoded), Some(ttl)),
        Err(e) => tracing::warn!(key, error = %e, "Failed to encode cache entry"),
    }

    Response::from_parts(parts, Body::from(bytes))
}
