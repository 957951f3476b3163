//! Inbound request adapter.
//!
//! # Responsibilities
//! - Convert axum request parts into the gateway `Request`
//! - Read the body within the endpoint's size limit
//! - Extract the request ID assigned by the request-id layer
//!
//! # Design Decisions
//! - Declared `Content-Length` rejected before buffering
//! - Empty bodies become `None`, never an empty typed body
//! - Non-UTF-8 header values are dropped

use axum::http::request::Parts;
use axum::http::HeaderMap;
use bytes::Bytes;

use crate::config::schema::{EndpointConfig, LimiterConfig};
use crate::error::{ErrorKind, GatewayError};
use crate::model::header::{CONTENT_TYPE, X_REQUEST_ID};
use crate::model::{Body, Header, Params, Query, Request};
use crate::security::limits;

pub fn header_from_map(headers: &HeaderMap) -> Header {
    Header::from_pairs(headers.iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|value| (name.as_str(), value.to_string()))
    }))
}

/// The request ID set by the request-id layer, or a fresh one.
pub fn request_id(header: &Header) -> String {
    header
        .get(X_REQUEST_ID)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub async fn read_body(
    header: &Header,
    body: axum::body::Body,
    limiter: &LimiterConfig,
) -> Result<Bytes, GatewayError> {
    if let Some(declared) = header
        .get("Content-Length")
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        limits::check_body_size(declared, limiter)?;
    }

    axum::body::to_bytes(body, limiter.max_body_size)
        .await
        .map_err(|e| GatewayError::new(ErrorKind::PayloadTooLarge, e.to_string()))
}

/// Build the running request for `endpoint`.
pub fn build_request(
    parts: &Parts,
    header: Header,
    body: Bytes,
    endpoint: &EndpointConfig,
    params: Params,
) -> Request {
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let query = Query::parse(parts.uri.query().unwrap_or_default());

    let body = (!body.is_empty()).then(|| {
        Body::from_mime(header.get(CONTENT_TYPE).unwrap_or_default(), body)
    });

    Request::new(parts.method.as_str(), url, endpoint.path.as_str())
        .with_params(params)
        .with_header(header)
        .with_query(query)
        .with_body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentType;
    use axum::http::Request as HttpRequest;

    fn parts(uri: &str) -> Parts {
        let (parts, _) = HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_build_request() {
        let parts = parts("/users/7?expand=orders");
        let endpoint = EndpointConfig {
            path: "/users/:id".into(),
            method: "POST".into(),
            ..Default::default()
        };
        let header = header_from_map(&parts.headers);

        let request = build_request(
            &parts,
            header,
            Bytes::from_static(br#"{"name":"ana"}"#),
            &endpoint,
            Params::new().set("id", "7"),
        );

        assert_eq!(request.method(), "POST");
        assert_eq!(request.url(), "/users/7?expand=orders");
        assert_eq!(request.path(), "/users/:id");
        assert_eq!(request.params().get("id"), Some("7"));
        assert_eq!(request.query().get("expand"), Some("orders"));
        assert_eq!(request.header().get_all("X-Tag"), ["a", "b"]);
        assert_eq!(request.body().unwrap().content_type(), ContentType::Json);
    }

    #[test]
    fn test_empty_body_is_none() {
        let parts = parts("/users");
        let request = build_request(
            &parts,
            Header::new(),
            Bytes::new(),
            &EndpointConfig::default(),
            Params::new(),
        );
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_read_body_limits() {
        let limiter = LimiterConfig {
            max_body_size: 4,
            ..Default::default()
        };

        let ok = read_body(&Header::new(), axum::body::Body::from("abcd"), &limiter).await;
        assert_eq!(ok.unwrap(), Bytes::from_static(b"abcd"));

        let err = read_body(&Header::new(), axum::body::Body::from("abcde"), &limiter)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);

        let declared = Header::new().set("Content-Length", "100");
        let err = read_body(&declared, axum::body::Body::empty(), &limiter)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
    }
}
