//! Directory path to URL pattern translation.
//!
//! Two dialects are produced from the same relative directory path:
//! - server patterns with named captures: `blog/_slug` → `blog/<slug>`
//! - client patterns with colon parameters: `blog/_slug` → `/blog/:slug`
//!
//! Segments starting with `_` are dynamic. Any other segment has its
//! underscores replaced with dashes in both dialects.

use crate::error::ConfigurationError;

/// Marker prefix for dynamic directory names.
pub const DYNAMIC_MARKER: char = '_';

/// Server and client patterns for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePatterns {
    /// Server pattern relative to the mount point (`""` for the root).
    pub url_pattern: String,
    /// Client pattern, always absolute (`"/"` for the root).
    pub route_pattern: String,
}

/// Translate a POSIX-style relative directory path into both dialects.
pub fn translate(route_path: &str) -> Result<RoutePatterns, ConfigurationError> {
    Ok(RoutePatterns {
        url_pattern: url_pattern(route_path)?,
        route_pattern: route_pattern(route_path)?,
    })
}

/// Convert a relative directory path to a server URL pattern.
pub fn url_pattern(route_path: &str) -> Result<String, ConfigurationError> {
    let segments = split(route_path)?;
    let mut pattern = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment.strip_prefix(DYNAMIC_MARKER) {
            Some(name) => pattern.push(format!("<{}>", name)),
            None => pattern.push(segment.replace('_', "-")),
        }
    }

    Ok(pattern.join("/"))
}

/// Convert a relative directory path to a client route pattern.
pub fn route_pattern(route_path: &str) -> Result<String, ConfigurationError> {
    let segments = split(route_path)?;
    let mut pattern = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment.strip_prefix(DYNAMIC_MARKER) {
            Some(name) => pattern.push(format!(":{}", camel_case(name))),
            None => pattern.push(segment.replace('_', "-")),
        }
    }

    Ok(format!("/{}", pattern.join("/")))
}

/// Parameter name as used on the client: `post_id` → `postId`.
pub fn camel_case(name: &str) -> String {
    let mut parts = name.split('_').filter(|p| !p.is_empty());
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Whether a server pattern segment is a `<name>` capture.
pub fn is_dynamic_segment(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('<') && segment.ends_with('>')
}

fn split(route_path: &str) -> Result<Vec<&str>, ConfigurationError> {
    if route_path.starts_with('/') {
        return Err(ConfigurationError::AbsolutePath(route_path.to_string()));
    }

    let segments: Vec<&str> = route_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.iter().any(|s| *s == "_") {
        return Err(ConfigurationError::EmptyParameter(route_path.to_string()));
    }

    Ok(segments)
}
