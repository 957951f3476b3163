//! Response rendering.
//!
//! # Responsibilities
//! - Convert the final gateway `Response` into an axum response
//! - Join multi-value headers for the wire
//! - Set `Content-Type` from the body
//!
//! # Design Decisions
//! - `Content-Length` is left to axum
//! - Invalid header names or values are skipped, not fatal

use axum::body::Body as AxumBody;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response as AxumResponse;

use crate::model::header::{CONTENT_LENGTH, CONTENT_TYPE};
use crate::model::Response;

pub fn render(response: &Response) -> AxumResponse {
    let body = response
        .body()
        .map(|b| AxumBody::from(b.raw().clone()))
        .unwrap_or_else(AxumBody::empty);
    let mut out = AxumResponse::new(body);

    *out.status_mut() =
        StatusCode::from_u16(response.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = out.headers_mut();
    for (name, value) in response.header().joined() {
        if name == CONTENT_LENGTH || name == CONTENT_TYPE {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::debug!(header = %name, "Skipping invalid response header"),
        }
    }

    if let Some(body) = response.body() {
        let mime = HeaderValue::from_str(body.mime())
            .unwrap_or_else(|_| HeaderValue::from_static(body.content_type().mime()));
        headers.insert(header::CONTENT_TYPE, mime);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Body, Header};
    use serde_json::json;

    #[test]
    fn test_render_joins_headers_and_sets_content_type() {
        let response = Response::written(
            201,
            Header::new()
                .add("X-Tag", "a")
                .add("X-Tag", "b")
                .set("Content-Type", "text/html"),
            Some(Body::json(&json!({"ok": true}))),
        );

        let rendered = render(&response);

        assert_eq!(rendered.status(), StatusCode::CREATED);
        assert_eq!(rendered.headers()["x-tag"], "a, b");
        assert_eq!(rendered.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_render_keeps_text_mime() {
        let response = Response::written(
            200,
            Header::new(),
            Some(Body::from_mime("text/csv", "id,name\n1,Ana\n")),
        );

        let rendered = render(&response);

        assert_eq!(rendered.headers()["content-type"], "text/csv");
    }

    #[test]
    fn test_render_without_body() {
        let rendered = render(&Response::new());
        assert_eq!(rendered.status(), StatusCode::NO_CONTENT);
        assert!(rendered.headers().get("content-type").is_none());
    }
}
