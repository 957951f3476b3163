//! Transformation engine.
//!
//! # Data Flow
//! ```text
//! Modifier { action, key, value }
//!     → dynamic::resolve(value, request, response)    placeholders substituted
//!     → parse_value                                   JSON-or-literal
//!     → modifier::modify_{header,query,params,body}   new value returned
//!
//! Body (raw bytes + ContentType)
//!     → codec decode → JSON tree
//!     → path editor / projection / mapper / nomenclature / omit_empty
//!     → codec encode → new Body
//! ```
//!
//! # Design Decisions
//! - Every content type goes through one `BodyCodec` implementation
//! - JSON surgery is isolated behind the `JsonPathEditor` trait
//! - Transformation failures are handled by `ModifierErrorPolicy`, not by callers

pub mod aggregate;
pub mod codec;
pub mod dynamic;
pub mod mapper;
pub mod modifier;
pub mod nomenclature;
pub mod omit_empty;
pub mod path;
pub mod projection;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::GatewayError;

pub use mapper::Mapper;
pub use modifier::ModifierAction;
pub use nomenclature::Nomenclature;
pub use omit_empty::omit_empty;
pub use projection::Projection;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("JSON path error: {0}")]
    JsonPath(String),

    #[error("failed to decode {content_type} body: {message}")]
    Decode {
        content_type: &'static str,
        message: String,
    },

    #[error("failed to encode {content_type} body: {message}")]
    Encode {
        content_type: &'static str,
        message: String,
    },
}

/// Parse a modifier value: valid JSON is inserted as JSON, anything else as a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// What happens when a body or header transformation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModifierErrorPolicy {
    /// Log a warning and keep the unmodified value.
    #[default]
    FailOpen,
    /// Terminate the orchestration with an internal error.
    FailClosed,
}

impl ModifierErrorPolicy {
    #[track_caller]
    pub fn recover<T>(self, result: Result<T, TransformError>, original: T) -> Result<T, GatewayError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => match self {
                ModifierErrorPolicy::FailOpen => {
                    tracing::warn!(error = %e, "transformation failed, keeping original value");
                    Ok(original)
                }
                ModifierErrorPolicy::FailClosed => Err(GatewayError::internal(e.to_string())),
            },
        }
    }
}
