//! Transport collaborator: the socket call to a backend.
//!
//! The engine builds the outbound request and parses the reply; a transport
//! only moves bytes.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::error::GatewayError;
use crate::model::header::CONTENT_TYPE;
use crate::model::{Body, Header};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    #[track_caller]
    pub fn into_gateway_error(self) -> GatewayError {
        match self {
            TransportError::Connection(message) => GatewayError::bad_gateway(message),
            TransportError::Timeout => GatewayError::gateway_timeout("backend call timed out"),
            TransportError::Request(message) => GatewayError::internal(message),
        }
    }
}

/// Fully built outbound call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub header: Header,
    pub body: Option<Body>,
    pub timeout: Duration,
}

/// Raw backend reply before it becomes a `BackendResponse`.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status_code: u16,
    pub header: Header,
    pub body: Bytes,
}

impl RawResponse {
    /// Typed body from the `Content-Type` header. Empty replies have no body.
    pub fn typed_body(&self) -> Option<Body> {
        if self.body.is_empty() {
            return None;
        }
        let mime = self.header.get(CONTENT_TYPE).unwrap_or_default();
        Some(Body::from_mime(mime, self.body.clone()))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn make_request(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport with transparent gzip decoding.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn make_request(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, values) in request.header.iter() {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, body.mime())
                .body(body.raw().clone());
        }

        let response = builder.send().await.map_err(classify)?;

        let status_code = response.status().as_u16();
        let mut header = Header::new();
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => header = header.add(name.as_str(), value),
                Err(_) => tracing::debug!(header = %name, "non-ASCII backend header dropped"),
            }
        }
        let body = response.bytes().await.map_err(classify)?;

        Ok(RawResponse {
            status_code,
            header,
            body,
        })
    }
}
