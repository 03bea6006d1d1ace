//! The request view handed to handlers.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, Method};
use serde_json::Value as JsonValue;

/// An authenticated user, inserted into request extensions by an auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub username: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Parsed request body for POST, PUT and PATCH.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    Form(BTreeMap<String, String>),
    Json(JsonValue),
}

/// Everything a handler can see about the current request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: Method,
    /// Full request path, including the mount prefix.
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HeaderMap,
    pub prefers_json: bool,
    pub principal: Option<Principal>,
    pub data: Option<RequestData>,
    /// Positional URL arguments.
    pub args: Vec<String>,
    /// Named URL arguments.
    pub kwargs: BTreeMap<String, String>,
}

impl RouteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            headers: HeaderMap::new(),
            prefers_json: false,
            principal: None,
            data: None,
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    /// Parse `query` (without the leading `?`).
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn kwarg(&self, name: &str) -> Option<&str> {
        self.kwargs.get(name).map(String::as_str)
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Form field or top-level JSON string field.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self.data.as_ref()? {
            RequestData::Form(form) => form.get(name).map(String::as_str),
            RequestData::Json(json) => json.get(name).and_then(JsonValue::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_fields() {
        let mut request = RouteRequest::new(Method::POST, "/todos").with_query("page=2&q=a%20b");
        assert_eq!(request.query_param("page"), Some("2"));
        assert_eq!(request.query_param("q"), Some("a b"));

        request.data = Some(RequestData::Json(serde_json::json!({"content": "Buy milk", "n": 1})));
        assert_eq!(request.field("content"), Some("Buy milk"));
        assert_eq!(request.field("n"), None);

        let form = BTreeMap::from([("title".to_string(), "Hi".to_string())]);
        request.data = Some(RequestData::Form(form));
        assert_eq!(request.field("title"), Some("Hi"));
    }

    #[test]
    fn test_authentication() {
        let request = RouteRequest::new(Method::GET, "/");
        assert!(!request.is_authenticated());
        let request = request.with_principal(Some(Principal::new("1").with_username("ada")));
        assert!(request.is_authenticated());
    }
}
