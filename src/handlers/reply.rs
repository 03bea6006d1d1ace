//! What a handler hands back to the dispatcher.

use axum::response::Response;

use super::value::Value;

/// A handler's polymorphic return value.
///
/// - `Value(Null)`: 204 No Content
/// - `Value(Map | Entity)`: 200 JSON
/// - `Value(Text)`: 200 with the text as body
/// - `Value(Int)`: empty response with that status (301/302 redirect to `/`)
/// - `Tuple([status, data])`: status with JSON or text body, or a redirect
/// - `Response`: passed through unchanged
///
/// Anything else is rejected during coercion as a handler bug.
#[derive(Debug)]
pub enum Reply {
    Value(Value),
    Tuple(Vec<Value>),
    Response(Response),
}

impl Reply {
    /// No content.
    pub fn none() -> Self {
        Reply::Value(Value::Null)
    }

    /// Status code and data.
    pub fn with_status(status: u16, data: impl Into<Value>) -> Self {
        Reply::Tuple(vec![Value::from(status), data.into()])
    }

    /// Redirect; 302 unless `permanent`.
    pub fn redirect(location: impl Into<String>, permanent: bool) -> Self {
        let status: u16 = if permanent { 301 } else { 302 };
        Reply::with_status(status, Value::Text(location.into()))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::Value(value.into())
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Value(s.into())
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Value(s.into())
    }
}

impl From<u16> for Reply {
    fn from(status: u16) -> Self {
        Reply::Value(status.into())
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::none()
    }
}

impl<D: Into<Value>> From<(u16, D)> for Reply {
    fn from((status, data): (u16, D)) -> Self {
        Reply::with_status(status, data)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}
