//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (endpoint lookup)
//!     → matcher.rs (template match, param extraction)
//!     → Return: RouteMatch { endpoint, params } | NotFound | MethodNotAllowed
//!
//! Route Compilation (on config load):
//!     EndpointConfig[]
//!     → Compile path templates
//!     → Sort by specificity
//!     → Freeze as immutable EndpointRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled on load, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same endpoint

pub mod matcher;
pub mod router;

pub use router::{EndpointRouter, RouteMatch};
