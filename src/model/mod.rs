//! Immutable request/response value model.
//!
//! # Data Flow
//! ```text
//! inbound HTTP call
//!     → Request (header, query, params, body)
//!     → per backend call: BackendRequest snapshot appended to Request.history
//!     → per backend reply: BackendResponse appended to Response.history
//!     → Response written once (aggregated) and rendered
//! ```
//!
//! # Design Decisions
//! - Values are never edited in place; modifying methods return a new value
//! - Histories only grow within one orchestration run
//! - A written or aborted Response is terminal

pub mod body;
pub mod header;
pub mod params;
pub mod query;
pub mod request;
pub mod response;

pub use body::{Body, ContentType};
pub use header::Header;
pub use params::Params;
pub use query::Query;
pub use request::{BackendRequest, Request};
pub use response::{BackendResponse, Response};
