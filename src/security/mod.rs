//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after endpoint lookup):
//!     → rate_limit.rs (token bucket per endpoint + client IP) → 429
//!     → limits.rs (header size, body size) → 413
//!     → Pass to orchestration
//! ```
//!
//! # Design Decisions
//! - Limits are resolved per endpoint once, at config load
//! - Fail closed: reject on any limit violation
//! - No trust in client input

pub mod limits;
pub mod rate_limit;

pub use rate_limit::RateLimiter;
