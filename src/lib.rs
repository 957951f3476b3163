//! HTTP API gateway: one inbound request fanned out to an ordered chain of
//! backend calls, shaped and aggregated into a single response.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod transform;

pub use config::schema::GatewayConfig;
pub use error::{ErrorKind, GatewayError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
