//! HTTP server setup and request pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, request ID)
//! - Hold the reloadable runtime (config, endpoint router, engine)
//! - Run the per-request pipeline: limits, cache, supervised orchestration
//! - Bind server to listener and shut down gracefully

use arc_swap::ArcSwap;
use axum::{
    extract::{ConnectInfo, Request as AxumRequest, State},
    response::Response as AxumResponse,
    routing::any,
    Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::cache::{cache_key, CacheStore, CachedResponse, MemoryCacheStore};
use crate::config::schema::{EndpointConfig, GatewayConfig};
use crate::engine::{Engine, ExecutionContext, ReqwestTransport, Transport, TransportError};
use crate::error::GatewayError;
use crate::http::{request, response};
use crate::model::{Request, Response};
use crate::observability::metrics;
use crate::resilience::run_supervised;
use crate::routing::{EndpointRouter, RouteMatch};
use crate::security::{limits, RateLimiter};

/// Everything derived from one configuration. Swapped as a whole on reload.
pub struct Runtime {
    pub config: Arc<GatewayConfig>,
    pub router: EndpointRouter,
    pub engine: Engine,
}

impl Runtime {
    fn build(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let config = config.resolve();
        let router = EndpointRouter::new(&config.endpoints);
        let engine = Engine::new(transport, config.settings.modifier_errors);
        Self {
            config: Arc::new(config),
            router,
            engine,
        }
    }

    fn endpoint(&self, index: usize) -> Result<&EndpointConfig, GatewayError> {
        self.config
            .endpoints
            .get(index)
            .ok_or_else(|| GatewayError::internal("matched endpoint missing from configuration"))
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    runtime: Arc<ArcSwap<Runtime>>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Replace the runtime with one built from `config`. In-flight requests keep the old one.
    pub fn reload(&self, config: GatewayConfig) {
        let runtime = Runtime::build(config, self.transport.clone());
        tracing::info!(endpoints = runtime.router.len(), "Runtime swapped");
        self.runtime.store(Arc::new(runtime));
    }

    pub fn runtime(&self) -> Arc<Runtime> {
        self.runtime.load_full()
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server calling backends over HTTP with an in-memory cache.
    pub fn new(config: GatewayConfig) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_collaborators(
            config,
            transport,
            Arc::new(MemoryCacheStore::new()),
        ))
    }

    pub fn with_collaborators(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let runtime = Runtime::build(config, transport.clone());
        let state = AppState {
            runtime: Arc::new(ArcSwap::from_pointee(runtime)),
            transport,
            cache,
            limiter: Arc::new(RateLimiter::new()),
        };
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.state.runtime().router.len(),
            "HTTP server starting"
        );

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.reload(config);
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every request goes through the endpoint router.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: AxumRequest,
) -> AxumResponse {
    let start = Instant::now();
    let runtime = state.runtime();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let route = match runtime.router.lookup(&method, &path) {
        Ok(route) => route,
        Err(err) => {
            tracing::debug!(method = %method, path = %path, error = %err, "No endpoint matched");
            metrics::record_request(&method, "none", err.status_code().as_u16(), start);
            return response::render(&Response::new().error(&path, &err));
        }
    };

    let (endpoint_id, endpoint_path) = match runtime.endpoint(route.endpoint) {
        Ok(endpoint) => (endpoint.id(), endpoint.path.clone()),
        Err(_) => (path.clone(), path.clone()),
    };

    let result = serve(&state, runtime, route, request, addr.ip()).await;
    let response = result.unwrap_or_else(|err| {
        tracing::warn!(endpoint = %endpoint_id, error = %err, "Request failed");
        Response::new().error(&endpoint_path, &err)
    });

    metrics::record_request(&method, &endpoint_id, response.status_code(), start);
    response::render(&response)
}

async fn serve(
    state: &AppState,
    runtime: Arc<Runtime>,
    route: RouteMatch,
    request: AxumRequest,
    client: IpAddr,
) -> Result<Response, GatewayError> {
    let endpoint = runtime.endpoint(route.endpoint)?;
    let settings = &endpoint.effective;

    state
        .limiter
        .check(&endpoint.id(), &client.to_string(), &settings.limiter.rate)?;

    let (parts, body) = request.into_parts();
    let header = request::header_from_map(&parts.headers);
    limits::check_header_size(&header, &settings.limiter)?;
    let body = request::read_body(&header, body, &settings.limiter).await?;
    let request_id = request::request_id(&header);
    let gateway_request = request::build_request(&parts, header, body, endpoint, route.params);

    let key = cacheable_key(endpoint, &gateway_request);
    if let Some(key) = key.as_deref() {
        if !skips_cache(endpoint, &gateway_request, "no-cache") {
            if let Some(cached) = lookup(state.cache.as_ref(), key).await {
                return Ok(cached);
            }
        }
    }
    let no_store = skips_cache(endpoint, &gateway_request, "no-store");

    tracing::debug!(
        request_id = %request_id,
        endpoint = %endpoint.id(),
        "Orchestrating request"
    );

    let ctx = ExecutionContext::new(settings.timeout, request_id);
    let worker_runtime = runtime.clone();
    let index = route.endpoint;
    let response = run_supervised(settings.timeout, async move {
        let endpoint = worker_runtime.endpoint(index)?;
        let (_, response) = worker_runtime
            .engine
            .handle(&ctx, &worker_runtime.config, endpoint, gateway_request)
            .await;
        Ok::<_, GatewayError>(response)
    })
    .await??;

    if let Some(key) = key.as_deref() {
        let storable = !no_store
            && response.is_written()
            && settings.cache.allows_status(response.status_code());
        if storable {
            store(state.cache.as_ref(), key, &response, settings.cache.duration()).await;
        }
    }

    Ok(response)
}

/// The cache key when caching applies to this endpoint and method.
fn cacheable_key(endpoint: &EndpointConfig, request: &Request) -> Option<String> {
    let cache = &endpoint.effective.cache;
    (cache.enabled && cache.allows_method(request.method())).then(|| cache_key(request, cache))
}

/// True when the client asked to bypass the cache with `directive`.
fn skips_cache(endpoint: &EndpointConfig, request: &Request, directive: &str) -> bool {
    endpoint.effective.cache.allow_cache_control
        && request
            .header()
            .get_all("Cache-Control")
            .iter()
            .flat_map(|v| v.split(','))
            .any(|d| d.trim().eq_ignore_ascii_case(directive))
}

async fn lookup(cache: &dyn CacheStore, key: &str) -> Option<Response> {
    let hit = match cache.get(key).await {
        Ok(Some(hit)) => hit,
        Ok(None) => {
            metrics::record_cache(false);
            return None;
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache lookup failed");
            return None;
        }
    };

    match CachedResponse::decode(&hit.value) {
        Ok(cached) => {
            tracing::debug!(key = %key, ttl_secs = hit.ttl.as_secs(), "Serving from cache");
            metrics::record_cache(true);
            Some(cached.into_response(hit.ttl))
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
            if let Err(e) = cache.del(key).await {
                tracing::warn!(key = %key, error = %e, "Cache delete failed");
            }
            None
        }
    }
}

async fn store(cache: &dyn CacheStore, key: &str, response: &Response, ttl: std::time::Duration) {
    let result = match CachedResponse::from_response(response).encode() {
        Ok(raw) => cache.set(key, raw, ttl).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(key = %key, error = %e, "Cache store failed");
    }
}
