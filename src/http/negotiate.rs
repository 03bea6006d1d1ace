//! Content negotiation and request body parsing.
//!
//! # Responsibilities
//! - Rank `Accept` to decide JSON vs HTML
//! - Rewrite `/path.json` style requests to `/path` with a JSON `Accept`
//! - Parse form and JSON bodies of POST, PUT and PATCH requests
//!
//! Malformed bodies are rejected with 400 before dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, uri::PathAndQuery, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::Response;

use crate::dispatch::{error_response, RequestData};

const JSON: &str = "application/json";
const HTML: &str = "text/html";
const FORM: &str = "application/x-www-form-urlencoded";

/// Settings for the negotiation middleware.
#[derive(Debug, Clone, Default)]
pub struct Negotiation {
    /// Path suffix → content type.
    pub intercept_extensions: BTreeMap<String, String>,
    pub max_body_size: usize,
}

/// Whether `Accept` ranks JSON above HTML. No header means HTML.
pub fn prefers_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mut json: Option<(f32, usize)> = None;
    let mut html: Option<(f32, usize)> = None;

    for (position, range) in accept.split(',').enumerate() {
        let mut params = range.split(';').map(str::trim);
        let media_type = params.next().unwrap_or_default().to_ascii_lowercase();
        let quality = params
            .filter_map(|p| p.strip_prefix("q="))
            .find_map(|q| q.parse::<f32>().ok())
            .unwrap_or(1.0);

        let slot = match media_type.as_str() {
            JSON => &mut json,
            HTML => &mut html,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some((quality, position));
        }
    }

    match (json, html) {
        (Some((q, _)), None) => q > 0.0,
        (Some((json_q, json_pos)), Some((html_q, html_pos))) => {
            json_q > html_q || (json_q == html_q && json_pos < html_pos)
        }
        _ => false,
    }
}

/// Middleware: extension interception, then body parsing.
pub async fn negotiate(State(settings): State<Arc<Negotiation>>, request: Request, next: Next) -> Response {
    let mut request = request;

    if request.method() == Method::GET || request.method() == Method::HEAD {
        intercept_extension(&mut request, &settings.intercept_extensions);
    }

    if matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH) {
        let json = prefers_json(request.headers());
        let (mut parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, settings.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read request body");
                return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large", json);
            }
        };

        match parse_body(&parts.headers, &bytes) {
            Ok(Some(data)) => {
                parts.extensions.insert(data);
            }
            Ok(None) => {}
            Err(detail) => {
                tracing::debug!(detail = %detail, "Rejecting malformed request body");
                return error_response(StatusCode::BAD_REQUEST, &detail, json);
            }
        }
        request = Request::from_parts(parts, Body::empty());
    }

    next.run(request).await
}

fn intercept_extension(request: &mut Request, extensions: &BTreeMap<String, String>) {
    let path = request.uri().path();
    let Some((stripped, content_type)) = extensions
        .iter()
        .find_map(|(suffix, ct)| path.strip_suffix(suffix.as_str()).map(|p| (p.to_string(), ct)))
    else {
        return;
    };
    let Ok(accept) = HeaderValue::from_str(content_type) else {
        return;
    };

    let path_and_query = match request.uri().query() {
        Some(query) => format!("{}?{}", stripped, query),
        None => stripped,
    };
    let mut parts = request.uri().clone().into_parts();
    match PathAndQuery::try_from(path_and_query) {
        Ok(pq) => parts.path_and_query = Some(pq),
        Err(_) => return,
    }
    if let Ok(uri) = Uri::from_parts(parts) {
        tracing::trace!(uri = %uri, accept = %content_type, "Intercepted extension");
        *request.uri_mut() = uri;
        request.headers_mut().insert(header::ACCEPT, accept);
    }
}

fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<Option<RequestData>, String> {
    if bytes.is_empty() {
        return Ok(None);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match content_type.as_str() {
        FORM => Ok(Some(RequestData::Form(
            url::form_urlencoded::parse(bytes).into_owned().collect(),
        ))),
        JSON => serde_json::from_slice(bytes)
            .map(|json| Some(RequestData::Json(json)))
            .map_err(|e| format!("Could not parse JSON data: {}", e)),
        other => Err(format!("Unsupported content type: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_prefers_json() {
        assert!(!prefers_json(&HeaderMap::new()));
        assert!(prefers_json(&accept("application/json")));
        assert!(!prefers_json(&accept("text/html,application/xhtml+xml,*/*;q=0.8")));
        assert!(prefers_json(&accept("application/json, text/html")));
        assert!(!prefers_json(&accept("text/html, application/json")));
        assert!(prefers_json(&accept("text/html;q=0.5, application/json")));
        assert!(!prefers_json(&accept("application/json;q=0")));
        assert!(!prefers_json(&accept("*/*")));
    }

    #[test]
    fn test_parse_body() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM));
        let data = parse_body(&headers, b"a=1&b=two").unwrap().unwrap();
        assert!(matches!(data, RequestData::Form(ref form) if form.get("b").map(String::as_str) == Some("two")));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(parse_body(&headers, br#"{"a": 1}"#).unwrap().is_some());
        assert!(parse_body(&headers, b"{nope").is_err());
        assert!(parse_body(&headers, b"").unwrap().is_none());

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(parse_body(&headers, b"hello").is_err());
    }

    #[test]
    fn test_intercept_extension() {
        let extensions = BTreeMap::from([(".json".to_string(), JSON.to_string())]);
        let mut request = Request::builder()
            .uri("/blog/post.json?x=1")
            .body(Body::empty())
            .unwrap();
        intercept_extension(&mut request, &extensions);

        assert_eq!(request.uri().path(), "/blog/post");
        assert_eq!(request.uri().query(), Some("x=1"));
        assert!(prefers_json(request.headers()));
    }
}
