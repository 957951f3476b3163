//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (method allowed, no `Cache-Control: no-cache`):
//!     → key.rs (METHOD:url[:strategy headers])
//!     → store.rs get → hit: entry.rs rebuilds a written Response
//!                        flagged X-Gateway-Cache / X-Gateway-Cache-Ttl
//!                    → miss: orchestrate, then store when the status allows
//! ```
//!
//! # Design Decisions
//! - The engine never sees the cache; hits short-circuit before orchestration
//! - The store is a trait so a shared backend can replace the in-memory one
//! - Only written (non-aborted) responses are stored

pub mod entry;
pub mod key;
pub mod store;

pub use entry::CachedResponse;
pub use key::cache_key;
pub use store::{CacheError, CacheHit, CacheStore, MemoryCacheStore};
