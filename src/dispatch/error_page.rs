//! Error responses generated by the framework itself.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use super::coerce::{json_response, HTML_CONTENT_TYPE};

/// HTML error page, or `{"status", "explanation", "detail"}` when JSON is preferred.
pub fn error_response(status: StatusCode, detail: &str, prefers_json: bool) -> Response {
    let explanation = status.canonical_reason().unwrap_or("Error");

    if prefers_json {
        return json_response(
            status,
            &serde_json::json!({
                "status": status.as_u16(),
                "explanation": explanation,
                "detail": detail,
            }),
        );
    }

    let html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  <title>{code} {explanation}</title>\n</head>\n<body>\n  <h1>{code} {explanation}</h1>\n  <p>{detail}</p>\n</body>\n</html>\n",
        code = status.as_u16(),
        explanation = escape_html(explanation),
        detail = escape_html(detail),
    );

    let mut response = Response::new(Body::from(html));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    response
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_error() {
        let response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed: PUT", true);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["explanation"], "Method Not Allowed");
        assert_eq!(json["status"], 405);
    }

    #[tokio::test]
    async fn test_html_error_escapes_detail() {
        let response = error_response(StatusCode::NOT_FOUND, "<script>", false);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("404 Not Found"));
        assert!(text.contains("&lt;script&gt;"));
    }
}
