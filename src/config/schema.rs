//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::model::ContentType;
use crate::transform::{Mapper, ModifierAction, ModifierErrorPolicy, Nomenclature, Projection};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Engine-wide behavior switches.
    pub settings: SettingsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Default request deadline in milliseconds.
    pub timeout_ms: u64,

    /// Default request limits.
    pub limiter: LimiterConfig,

    /// Default response cache settings.
    pub cache: CacheConfig,

    /// Named backends usable as beforewares/afterwares.
    pub middlewares: BTreeMap<String, Arc<BackendConfig>>,

    /// Endpoint definitions.
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            settings: SettingsConfig::default(),
            observability: ObservabilityConfig::default(),
            timeout_ms: 30_000,
            limiter: LimiterConfig::default(),
            cache: CacheConfig::default(),
            middlewares: BTreeMap::new(),
            endpoints: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Layer every endpoint's overrides over the global values.
    ///
    /// Runs once after parsing; read sites use `EndpointConfig::effective`.
    pub fn resolve(mut self) -> Self {
        let timeout = Duration::from_millis(self.timeout_ms);
        for endpoint in &mut self.endpoints {
            let backend_count = endpoint
                .beforewares
                .iter()
                .chain(endpoint.afterwares.iter())
                .filter(|name| self.middlewares.contains_key(name.as_str()))
                .count()
                + endpoint.backends.len();

            endpoint.effective = EffectiveSettings {
                timeout: endpoint
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(timeout),
                limiter: endpoint.limiter.layer(&self.limiter),
                cache: endpoint.cache.layer(&self.cache),
                backend_count,
            };
        }
        self
    }

    pub fn middleware(&self, name: &str) -> Option<&Arc<BackendConfig>> {
        self.middlewares.get(name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Behavior when a body or header transformation fails.
    pub modifier_errors: ModifierErrorPolicy,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request size and rate limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Maximum total header size in bytes.
    pub max_header_size: usize,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    pub rate: RateConfig,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_header_size: 1024 * 1024,   // 1MB
            max_body_size: 3 * 1024 * 1024, // 3MB
            rate: RateConfig::default(),
        }
    }
}

/// Token bucket per endpoint and client IP.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateConfig {
    /// Bucket size. 0 disables rate limiting.
    pub capacity: u32,

    /// Refill period for a full bucket, in milliseconds.
    pub every_ms: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            every_ms: 1000,
        }
    }
}

/// Endpoint-level limiter overrides. Unset fields inherit the global value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterOverride {
    pub max_header_size: Option<usize>,
    pub max_body_size: Option<usize>,
    pub rate: Option<RateConfig>,
}

impl LimiterOverride {
    pub fn layer(&self, base: &LimiterConfig) -> LimiterConfig {
        LimiterConfig {
            max_header_size: self.max_header_size.unwrap_or(base.max_header_size),
            max_body_size: self.max_body_size.unwrap_or(base.max_body_size),
            rate: self.rate.clone().unwrap_or_else(|| base.rate.clone()),
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Entry lifetime in milliseconds.
    pub duration_ms: u64,

    /// Request headers whose values are part of the cache key.
    pub strategy_headers: Vec<String>,

    /// Methods eligible for caching.
    pub only_if_methods: Vec<String>,

    /// Response statuses eligible for caching. Empty means any status.
    pub only_if_status_codes: Vec<u16>,

    /// Honor `Cache-Control: no-cache` / `no-store` from clients.
    pub allow_cache_control: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_ms: 60_000,
            strategy_headers: Vec::new(),
            only_if_methods: vec!["GET".to_string()],
            only_if_status_codes: vec![200, 201, 202, 203, 204, 206],
            allow_cache_control: true,
        }
    }
}

impl CacheConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn allows_method(&self, method: &str) -> bool {
        self.only_if_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn allows_status(&self, status: u16) -> bool {
        self.only_if_status_codes.is_empty() || self.only_if_status_codes.contains(&status)
    }
}

/// Endpoint-level cache overrides. Unset fields inherit the global value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheOverride {
    pub enabled: Option<bool>,
    pub duration_ms: Option<u64>,
    pub strategy_headers: Option<Vec<String>>,
    pub only_if_methods: Option<Vec<String>>,
    pub only_if_status_codes: Option<Vec<u16>>,
    pub allow_cache_control: Option<bool>,
}

impl CacheOverride {
    pub fn layer(&self, base: &CacheConfig) -> CacheConfig {
        CacheConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            duration_ms: self.duration_ms.unwrap_or(base.duration_ms),
            strategy_headers: self
                .strategy_headers
                .clone()
                .unwrap_or_else(|| base.strategy_headers.clone()),
            only_if_methods: self
                .only_if_methods
                .clone()
                .unwrap_or_else(|| base.only_if_methods.clone()),
            only_if_status_codes: self
                .only_if_status_codes
                .clone()
                .unwrap_or_else(|| base.only_if_status_codes.clone()),
            allow_cache_control: self.allow_cache_control.unwrap_or(base.allow_cache_control),
        }
    }
}

/// Concrete settings of one endpoint after layering over the global values.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub timeout: Duration,
    pub limiter: LimiterConfig,
    pub cache: CacheConfig,
    /// Backends expected to answer: beforewares, backends and afterwares that resolve.
    pub backend_count: usize,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            limiter: LimiterConfig::default(),
            cache: CacheConfig::default(),
            backend_count: 0,
        }
    }
}

/// One gateway endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path template, e.g. `/users/:id`.
    pub path: String,

    /// HTTP method (default: GET).
    pub method: String,

    /// Request deadline override in milliseconds.
    pub timeout_ms: Option<u64>,

    pub limiter: LimiterOverride,

    pub cache: CacheOverride,

    /// Backend statuses that stop the pipeline. Unset means any status >= 400.
    pub abort_if_status_codes: Option<Vec<u16>>,

    /// Middleware names run before the backends.
    pub beforewares: Vec<String>,

    /// Middleware names run after the backends.
    pub afterwares: Vec<String>,

    pub backends: Vec<Arc<BackendConfig>>,

    pub response: EndpointResponseConfig,

    #[serde(skip)]
    pub effective: EffectiveSettings,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            method: "GET".to_string(),
            timeout_ms: None,
            limiter: LimiterOverride::default(),
            cache: CacheOverride::default(),
            abort_if_status_codes: None,
            beforewares: Vec::new(),
            afterwares: Vec::new(),
            backends: Vec::new(),
            response: EndpointResponseConfig::default(),
            effective: EffectiveSettings::default(),
        }
    }
}

impl EndpointConfig {
    /// Whether a backend status terminates the pipeline.
    pub fn abort(&self, status_code: u16) -> bool {
        match &self.abort_if_status_codes {
            Some(codes) => codes.contains(&status_code),
            None => status_code >= 400,
        }
    }

    /// `METHOD path`, used in logs and error bodies.
    pub fn id(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.path)
    }
}

/// Final response shaping of an endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointResponseConfig {
    /// Merge multiple backend bodies into one object instead of a list.
    pub aggregate: bool,

    /// Re-encode the final body in this content type.
    pub encode: Option<ContentType>,

    /// Rewrite every key of the final body in this case.
    pub nomenclature: Option<Nomenclature>,

    /// Strip empty values from the final body.
    pub omit_empty: bool,
}

/// One backend call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Identifier used in logs and metrics.
    pub name: String,

    /// Target hosts, e.g. `http://users:8080`.
    pub hosts: Vec<String>,

    /// Path template; `:param` segments are filled from the request params.
    pub path: String,

    /// HTTP method. Unset forwards the inbound method.
    pub method: Option<String>,

    /// Inbound headers forwarded to this backend. `*` forwards all.
    pub forward_headers: Vec<String>,

    /// Inbound query keys forwarded to this backend. `*` forwards all.
    pub forward_queries: Vec<String>,

    pub modifiers: ModifiersConfig,

    pub response: BackendResponseConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            hosts: Vec::new(),
            path: "/".to_string(),
            method: None,
            forward_headers: vec!["*".to_string()],
            forward_queries: vec!["*".to_string()],
            modifiers: ModifiersConfig::default(),
            response: BackendResponseConfig::default(),
        }
    }
}

/// Modifier lists, one per addressable surface.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModifiersConfig {
    pub header: Vec<Modifier>,
    pub params: Vec<Modifier>,
    pub query: Vec<Modifier>,
    pub body: Vec<Modifier>,
}

impl ModifiersConfig {
    /// Every modifier of `scope`, surface by surface in declaration order.
    pub fn in_scope(&self, scope: ModifierScope) -> impl Iterator<Item = (ModifierTarget, &Modifier)> {
        self.header
            .iter()
            .map(|m| (ModifierTarget::Header, m))
            .chain(self.params.iter().map(|m| (ModifierTarget::Params, m)))
            .chain(self.query.iter().map(|m| (ModifierTarget::Query, m)))
            .chain(self.body.iter().map(|m| (ModifierTarget::Body, m)))
            .filter(move |(_, m)| m.scope == scope)
    }
}

/// Surface a modifier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierTarget {
    Header,
    Params,
    Query,
    Body,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModifierScope {
    #[default]
    Request,
    Response,
}

/// One rewrite rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Modifier {
    #[serde(default)]
    pub scope: ModifierScope,

    pub action: ModifierAction,

    /// Header name, query key, param name or body path.
    #[serde(default)]
    pub key: String,

    /// May embed `#request.*` / `#response.*` placeholders.
    #[serde(default)]
    pub value: String,

    /// Request scope only: also rewrite the running request seen by later backends.
    #[serde(default)]
    pub propagate: bool,
}

/// When a backend's response shaping runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplyMoment {
    /// Right after the backend call returns.
    #[default]
    Early,
    /// Only when the final response is written.
    Late,
}

/// Response shaping of one backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendResponseConfig {
    /// Hide from the final response; still counts toward completeness.
    pub omit: bool,
    pub omit_header: bool,
    pub omit_body: bool,
    /// Key under which this body is nested when aggregating.
    pub group: Option<String>,
    pub apply: ApplyMoment,
    pub mapper: Mapper,
    pub projection: Projection,
}
