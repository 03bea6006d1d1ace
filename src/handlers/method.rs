//! HTTP methods a handler can be bound to.

use std::fmt;
use std::str::FromStr;

use axum::http::Method as HttpMethod;

use crate::error::ConfigurationError;

/// Known handler methods, named in lowercase the way handler modules use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// All known methods, in `Allow` header order.
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
    ];

    /// Lowercase method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Head => "head",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
            Method::Options => "options",
        }
    }

    /// Safe methods are the only ones that may be cached.
    pub fn is_safe(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }

    /// Map an HTTP method from the host framework.
    pub fn from_http(method: &HttpMethod) -> Option<Self> {
        let known = [
            (HttpMethod::GET, Method::Get),
            (HttpMethod::HEAD, Method::Head),
            (HttpMethod::POST, Method::Post),
            (HttpMethod::PUT, Method::Put),
            (HttpMethod::PATCH, Method::Patch),
            (HttpMethod::DELETE, Method::Delete),
            (HttpMethod::OPTIONS, Method::Options),
        ];
        known
            .into_iter()
            .find_map(|(http, known)| (http == *method).then_some(known))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigurationError::UnknownMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("trace".parse::<Method>().is_err());
    }

    #[test]
    fn test_from_http() {
        assert_eq!(Method::from_http(&HttpMethod::DELETE), Some(Method::Delete));
        assert_eq!(Method::from_http(&HttpMethod::TRACE), None);
    }
}
