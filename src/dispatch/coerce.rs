//! Reply to HTTP response coercion.
//!
//! A total match over [`Reply`]: every documented shape has one response,
//! everything else is a [`HandlerError`].

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::error::{CoercionError, HandlerError};
use crate::handlers::{Reply, Value};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A reply after validation, before it becomes a response.
#[derive(Debug)]
pub enum Coerced {
    Empty { status: StatusCode },
    Json { status: StatusCode, body: serde_json::Value },
    Text { status: StatusCode, body: String },
    Redirect { location: HeaderValue, permanent: bool },
    Response(Response),
}

impl Coerced {
    pub fn status(&self) -> StatusCode {
        match self {
            Coerced::Empty { status } | Coerced::Json { status, .. } | Coerced::Text { status, .. } => *status,
            Coerced::Redirect { permanent: true, .. } => StatusCode::MOVED_PERMANENTLY,
            Coerced::Redirect { permanent: false, .. } => StatusCode::FOUND,
            Coerced::Response(response) => response.status(),
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            Coerced::Empty { status } => with_status(Response::new(Body::empty()), status),
            Coerced::Json { status, body } => json_response(status, &body),
            Coerced::Text { status, body } => {
                let mut response = with_status(Response::new(Body::from(body)), status);
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
                response
            }
            Coerced::Redirect { location, permanent } => {
                let status = if permanent {
                    StatusCode::MOVED_PERMANENTLY
                } else {
                    StatusCode::FOUND
                };
                let mut response = with_status(Response::new(Body::empty()), status);
                response.headers_mut().insert(header::LOCATION, location);
                response
            }
            Coerced::Response(response) => response,
        }
    }
}

/// Validate and normalize a handler's reply.
pub fn coerce(reply: Reply, prefers_json: bool) -> Result<Coerced, CoercionError> {
    match reply {
        Reply::Response(response) => Ok(Coerced::Response(response)),
        Reply::Value(Value::Null) => Ok(Coerced::Empty {
            status: StatusCode::NO_CONTENT,
        }),
        Reply::Value(value @ (Value::Map(_) | Value::Entity(_))) => Ok(Coerced::Json {
            status: StatusCode::OK,
            body: value.to_json()?,
        }),
        Reply::Value(Value::Text(body)) => Ok(Coerced::Text {
            status: StatusCode::OK,
            body,
        }),
        Reply::Value(Value::Int(code)) => {
            let status = status_code(code)?;
            if is_redirect(status) {
                return Ok(Coerced::Redirect {
                    location: HeaderValue::from_static("/"),
                    permanent: status == StatusCode::MOVED_PERMANENTLY,
                });
            }
            if prefers_json {
                Ok(Coerced::Json {
                    status,
                    body: serde_json::Value::Object(serde_json::Map::new()),
                })
            } else {
                Ok(Coerced::Empty { status })
            }
        }
        Reply::Value(other) => Err(HandlerError::ReplyType(other.type_name()).into()),
        Reply::Tuple(items) => coerce_tuple(items),
    }
}

fn coerce_tuple(items: Vec<Value>) -> Result<Coerced, CoercionError> {
    let [status, data]: [Value; 2] = items
        .try_into()
        .map_err(|items: Vec<Value>| HandlerError::TupleArity(items.len()))?;

    let status = match status {
        Value::Int(code) => status_code(code)?,
        other => return Err(HandlerError::StatusType(other.type_name()).into()),
    };

    if is_redirect(status) {
        return match data {
            Value::Text(location) => Ok(Coerced::Redirect {
                location: HeaderValue::from_str(&location)
                    .map_err(|_| HandlerError::InvalidRedirectLocation(location.clone()))?,
                permanent: status == StatusCode::MOVED_PERMANENTLY,
            }),
            other => Err(HandlerError::RedirectTarget(other.type_name()).into()),
        };
    }

    match data {
        data @ (Value::Map(_) | Value::Entity(_)) => Ok(Coerced::Json {
            status,
            body: data.to_json()?,
        }),
        Value::Text(body) => Ok(Coerced::Text { status, body }),
        other => Err(HandlerError::DataType(other.type_name()).into()),
    }
}

fn status_code(code: i64) -> Result<StatusCode, HandlerError> {
    u16::try_from(code)
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or(HandlerError::StatusCode(code))
}

fn is_redirect(status: StatusCode) -> bool {
    status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND
}

fn with_status(mut response: Response, status: StatusCode) -> Response {
    *response.status_mut() = status;
    response
}

/// Compact JSON response.
pub fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    let mut response = with_status(Response::new(Body::from(body.to_string())), status);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}
