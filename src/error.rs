//! Error taxonomy and the JSON error body written to clients.
//!
//! Backend 4xx/5xx statuses are not errors: they travel as ordinary backend
//! responses and are subject to the endpoint abort policy. The errors here
//! are produced by the gateway itself.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::panic::Location;
use thiserror::Error;

/// Classification of gateway-originated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Backend connection refused or reset.
    BadGateway,
    /// Transport or pipeline deadline exceeded.
    GatewayTimeout,
    /// Panic, unresolvable configuration reference, unexpected transformation error.
    Internal,
    /// Every backend response was filtered out of the final aggregate.
    EndpointRespondedNothing,
    /// Request header or body exceeds the endpoint limiter.
    PayloadTooLarge,
    /// Rate limit bucket exhausted.
    TooManyRequests,
    /// No endpoint matches the request path.
    NotFound,
    /// An endpoint matches the path but not the method.
    MethodNotAllowed,
}

impl ErrorKind {
    /// HTTP status written for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::EndpointRespondedNothing => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// A gateway error tagged with the source location that raised it.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    kind: ErrorKind,
    message: String,
    file: &'static str,
    line: u32,
}

impl GatewayError {
    /// Create an error, capturing the caller's file and line.
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            kind,
            message: message.into(),
            file: location.file(),
            line: location.line(),
        }
    }

    #[track_caller]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, message)
    }

    #[track_caller]
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GatewayTimeout, message)
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[track_caller]
    pub fn responded_nothing() -> Self {
        Self::new(
            ErrorKind::EndpointRespondedNothing,
            "endpoint responded nothing, check the omit settings of its backends",
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Build the wire body for this error raised while serving `endpoint`.
    pub fn to_body(&self, endpoint: &str) -> ErrorBody {
        ErrorBody {
            file: self.file.to_string(),
            line: self.line,
            endpoint: endpoint.to_string(),
            message: self.message.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// JSON error body written to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub file: String,
    pub line: u32,
    pub endpoint: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Vec<u8> {
        json!({
            "file": self.file,
            "line": self.line,
            "endpoint": self.endpoint,
            "message": self.message,
            "timestamp": self.timestamp.to_rfc3339(),
        })
        .to_string()
        .into_bytes()
    }
}
