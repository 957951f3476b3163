//! Request size limits.
//!
//! # Responsibilities
//! - Enforce maximum header size
//! - Enforce maximum request body size
//!
//! # Design Decisions
//! - Header size checked before the body is read (early rejection)
//! - Declared `Content-Length` checked before buffering; the buffered read is capped too
//! - Limits resolved per endpoint over the global limiter
//! - Return 413 Payload Too Large

use crate::config::schema::LimiterConfig;
use crate::error::{ErrorKind, GatewayError};
use crate::model::Header;

pub fn check_header_size(header: &Header, limiter: &LimiterConfig) -> Result<(), GatewayError> {
    let size = header.size();
    if size > limiter.max_header_size {
        return Err(GatewayError::new(
            ErrorKind::PayloadTooLarge,
            format!(
                "header too large: {} bytes exceeds the limit of {} bytes",
                size, limiter.max_header_size
            ),
        ));
    }
    Ok(())
}

pub fn check_body_size(size: usize, limiter: &LimiterConfig) -> Result<(), GatewayError> {
    if size > limiter.max_body_size {
        return Err(GatewayError::new(
            ErrorKind::PayloadTooLarge,
            format!(
                "payload too large: {} bytes exceeds the limit of {} bytes",
                size, limiter.max_body_size
            ),
        ));
    }
    Ok(())
}
