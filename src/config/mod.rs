//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/JSON/YAML)
//!     → loader.rs (parse & deserialize, format by extension)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig::resolve (endpoint overrides layered over globals)
//!     → shared via Arc to the server runtime
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads, validates and resolves the new config
//!     → mpsc channel to the server
//!     → atomic swap of the runtime (ArcSwap)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Endpoint settings are layered once; read sites never check for unset values
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{BackendConfig, EndpointConfig, GatewayConfig};
