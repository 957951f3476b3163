//! Endpoint orchestrator.

use std::sync::Arc;

use crate::config::schema::{BackendConfig, EndpointConfig, GatewayConfig};
use crate::engine::backend::BackendService;
use crate::engine::ExecutionContext;
use crate::model::{Request, Response};

/// Pipeline stages, run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Beforewares,
    Backends,
    Afterwares,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Beforewares, Stage::Backends, Stage::Afterwares];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Beforewares => "beforewares",
            Stage::Backends => "backends",
            Stage::Afterwares => "afterwares",
        }
    }
}

#[derive(Clone)]
pub struct EndpointService {
    backend: BackendService,
}

impl EndpointService {
    pub fn new(backend: BackendService) -> Self {
        Self { backend }
    }

    /// Run every stage. Returns as soon as the response is aborted or written.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        config: &GatewayConfig,
        endpoint: &EndpointConfig,
        request: Request,
    ) -> (Request, Response) {
        let mut request = request;
        let mut response = Response::new();

        for stage in Stage::ORDER {
            for backend in stage_backends(config, endpoint, stage) {
                (request, response) = self
                    .backend
                    .execute(ctx, endpoint, &backend, request, response)
                    .await;

                if response.is_terminal() {
                    tracing::debug!(
                        endpoint = %endpoint.id(),
                        stage = stage.as_str(),
                        backend = %backend.name,
                        status = response.status_code(),
                        "Pipeline stopped early"
                    );
                    return (request, response);
                }
            }
        }

        (request, response)
    }
}

/// Backends of one stage. Unknown middleware names are skipped.
fn stage_backends(
    config: &GatewayConfig,
    endpoint: &EndpointConfig,
    stage: Stage,
) -> Vec<Arc<BackendConfig>> {
    let names = match stage {
        Stage::Backends => return endpoint.backends.clone(),
        Stage::Beforewares => &endpoint.beforewares,
        Stage::Afterwares => &endpoint.afterwares,
    };

    names
        .iter()
        .filter_map(|name| match config.middleware(name) {
            Some(backend) => Some(backend.clone()),
            None => {
                tracing::warn!(
                    endpoint = %endpoint.id(),
                    stage = stage.as_str(),
                    middleware = %name,
                    "Unknown middleware skipped"
                );
                None
            }
        })
        .collect()
}
