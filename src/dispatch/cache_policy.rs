//! `Cache-Control`, `Expires` and `Vary` for GET/HEAD responses.
//!
//! - private handler or authenticated request: `private`, never `public`
//! - otherwise with a cache time: `public, max-age=N` plus `Expires`
//! - extra directives are merged in after those
//! - `Vary` lists the handler's configured headers

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use chrono::{Duration as ChronoDuration, Utc};

use crate::handlers::{CacheConfig, Method};

/// HTTP date format for `Expires`.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

type Directive = (String, Option<String>);

/// Apply caching headers to `response`. Non-safe methods are left alone.
pub fn apply_cache_policy(
    response: &mut Response,
    method: Method,
    cache: Option<&CacheConfig>,
    authenticated: bool,
) {
    if !method.is_safe() {
        return;
    }

    let private = authenticated || cache.map(CacheConfig::is_private).unwrap_or(false);
    let cache_time = cache.and_then(|c| c.cache_time);
    let headers = response.headers_mut();

    let mut directives: Vec<Directive> = Vec::new();
    if private {
        directives.push(("private".to_string(), None));
    } else if let Some(seconds) = cache_time {
        directives.push(("public".to_string(), None));
        directives.push(("max-age".to_string(), Some(seconds.to_string())));
    }

    if let Some(cache) = cache {
        for (name, value) in &cache.cache_control {
            // TOML has no null: an empty value means a bare directive.
            merge(&mut directives, normalize(name), value.clone().filter(|v| !v.is_empty()));
        }
    }
    for (name, value) in existing_directives(headers) {
        merge(&mut directives, name, value);
    }

    if private {
        directives.retain(|(name, _)| name != "public");
    }

    if !directives.is_empty() {
        set_header(headers, header::CACHE_CONTROL, &render(&directives));
    }

    if !private {
        if let Some(seconds) = cache_time {
            let expires = Utc::now() + ChronoDuration::seconds(i64::from(seconds));
            set_header(headers, header::EXPIRES, &expires.format(HTTP_DATE_FORMAT).to_string());
        }
    }

    if let Some(cache) = cache {
        patch_vary(headers, &cache.vary_on);
    }
}

/// Add `names` to the `Vary` header, skipping ones already present.
pub fn patch_vary(headers: &mut HeaderMap, names: &[String]) {
    if names.is_empty() {
        return;
    }

    let mut vary: Vec<String> = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    for name in names {
        if !vary.iter().any(|v| v.eq_ignore_ascii_case(name)) {
            vary.push(name.clone());
        }
    }

    headers.remove(header::VARY);
    set_header(headers, header::VARY, &vary.join(", "));
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

fn merge(directives: &mut Vec<Directive>, name: String, value: Option<String>) {
    let conflicts: &[&str] = match name.as_str() {
        "public" => &["private"],
        "private" => &["public"],
        _ => &[],
    };
    if directives.iter().any(|(n, _)| conflicts.contains(&n.as_str())) {
        return;
    }
    if let Some(existing) = directives.iter_mut().find(|(n, _)| *n == name) {
        if value.is_some() && name != "max-age" {
            existing.1 = value;
        }
        return;
    }
    directives.push((name, value));
}

fn existing_directives(headers: &HeaderMap) -> Vec<Directive> {
    headers
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|d| match d.split_once('=') {
                    Some((name, value)) => (normalize(name), Some(value.trim().to_string())),
                    None => (normalize(d), None),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn render(directives: &[Directive]) -> String {
    directives
        .iter()
        .map(|(name, value)| match value {
            Some(value) => format!("{}={}", name, value),
            None => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn set_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "Skipping invalid header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::collections::BTreeMap;

    fn response() -> Response {
        Response::new(Body::empty())
    }

    fn cached(seconds: u32) -> CacheConfig {
        CacheConfig {
            cache_time: Some(seconds),
            ..CacheConfig::default()
        }
    }

    fn header_value<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_anonymous_public_cache() {
        let mut response = response();
        apply_cache_policy(&mut response, Method::Get, Some(&cached(5)), false);

        assert_eq!(header_value(&response, header::CACHE_CONTROL), Some("public, max-age=5"));
        assert!(header_value(&response, header::EXPIRES).unwrap().ends_with(" GMT"));
        assert_eq!(header_value(&response, header::VARY), Some("Accept"));
    }

    #[test]
    fn test_authenticated_is_private() {
        let mut response = response();
        apply_cache_policy(&mut response, Method::Get, Some(&cached(5)), true);

        assert_eq!(header_value(&response, header::CACHE_CONTROL), Some("private"));
        assert!(response.headers().get(header::EXPIRES).is_none());
    }

    #[test]
    fn test_private_handler() {
        let config = CacheConfig {
            private: Some(true),
            ..CacheConfig::default()
        };
        let mut response = response();
        apply_cache_policy(&mut response, Method::Head, Some(&config), false);
        assert_eq!(header_value(&response, header::CACHE_CONTROL), Some("private"));
    }

    #[test]
    fn test_extra_directives() {
        let config = CacheConfig {
            cache_time: Some(60),
            cache_control: BTreeMap::from([
                ("must_revalidate".to_string(), None),
                ("stale-while-revalidate".to_string(), Some("30".to_string())),
            ]),
            ..CacheConfig::default()
        };
        let mut response = response();
        apply_cache_policy(&mut response, Method::Get, Some(&config), false);
        assert_eq!(
            header_value(&response, header::CACHE_CONTROL),
            Some("public, max-age=60, must-revalidate, stale-while-revalidate=30")
        );

        let mut response = self::response();
        apply_cache_policy(&mut response, Method::Get, Some(&config), true);
        assert_eq!(
            header_value(&response, header::CACHE_CONTROL),
            Some("private, must-revalidate, stale-while-revalidate=30")
        );
    }

    #[test]
    fn test_unsafe_methods_untouched() {
        let mut response = response();
        apply_cache_policy(&mut response, Method::Post, Some(&cached(5)), true);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_no_config_anonymous_adds_nothing() {
        let mut response = response();
        apply_cache_policy(&mut response, Method::Get, None, false);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_vary_merges() {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
        patch_vary(&mut headers, &["Accept".to_string(), "Accept-Encoding".to_string()]);
        assert_eq!(headers[header::VARY], "accept-encoding, Accept");
    }
}
