//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → routing (endpoint lookup, path params)
//!     → security (rate limit, size limits)
//!     → request.rs (axum parts → gateway Request)
//!     → cache lookup | supervised orchestration → cache store
//!     → response.rs (gateway Response → axum response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
