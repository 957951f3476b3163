//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → timeouts.rs (pipeline on a supervised task, bounded by the endpoint deadline)
//!     → Ok(response) | GatewayTimeout | Internal (panic)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every request has a deadline
//! - No retries and no fallback backends: a failed call ends the request

pub mod timeouts;

pub use timeouts::run_supervised;
