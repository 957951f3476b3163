//! Orchestration engine.
//!
//! # Data Flow
//! ```text
//! Request (from the inbound adapter)
//!     → endpoint.rs   Beforewares → Backends → Afterwares, stop on abort/written
//!         → backend.rs per backend:
//!             propagate modifiers → BackendRequest snapshot → transport.rs call
//!             → BackendResponse (EARLY shaping) → abort check or append
//!     → writer.rs     LATE shaping, omit filter, aggregate, final shaping
//! Response (to the renderer)
//! ```
//!
//! # Design Decisions
//! - Backends run strictly sequentially; history order is configuration order
//! - The transport is injected, so the engine never owns sockets
//! - Backend 4xx/5xx are data subject to the abort policy, not errors

pub mod backend;
pub mod endpoint;
pub mod transport;
pub mod writer;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::schema::{EndpointConfig, GatewayConfig};
use crate::model::{Request, Response};
use crate::transform::ModifierErrorPolicy;

pub use backend::BackendService;
pub use endpoint::EndpointService;
pub use transport::{OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError};

/// Per-request execution state shared by every backend call.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    deadline: Instant,
    request_id: String,
}

impl ExecutionContext {
    pub fn new(timeout: Duration, request_id: impl Into<String>) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            request_id: request_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Time left before the request deadline, zero once it passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Orchestrator plus writer: one inbound request in, final response out.
#[derive(Clone)]
pub struct Engine {
    endpoints: EndpointService,
    policy: ModifierErrorPolicy,
}

impl Engine {
    pub fn new(transport: Arc<dyn Transport>, policy: ModifierErrorPolicy) -> Self {
        Self {
            endpoints: EndpointService::new(BackendService::new(transport, policy)),
            policy,
        }
    }

    pub async fn handle(
        &self,
        ctx: &ExecutionContext,
        config: &GatewayConfig,
        endpoint: &EndpointConfig,
        request: Request,
    ) -> (Request, Response) {
        let (request, response) = self.endpoints.execute(ctx, config, endpoint, request).await;
        let response = writer::write(endpoint, self.policy, &request, response);
        (request, response)
    }
}
