//! Backend responses and the accumulated endpoint response.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::schema::{BackendConfig, ModifierScope, ModifierTarget};
use crate::error::GatewayError;
use crate::model::{Body, ContentType, Header, Request};
use crate::transform::dynamic;
use crate::transform::modifier::{modify_body, modify_header};
use crate::transform::ModifierErrorPolicy;

/// Reply of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    config: Arc<BackendConfig>,
    status_code: u16,
    header: Header,
    body: Option<Body>,
    group: Option<String>,
    omit: bool,
    applied: bool,
}

impl BackendResponse {
    pub fn new(
        config: Arc<BackendConfig>,
        status_code: u16,
        header: Header,
        body: Option<Body>,
    ) -> Self {
        Self {
            group: config.response.group.clone().filter(|g| !g.is_empty()),
            omit: config.response.omit,
            config,
            status_code,
            header,
            body,
            applied: false,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn omit(&self) -> bool {
        self.omit
    }

    pub fn applied(&self) -> bool {
        self.applied
    }

    pub fn ok(&self) -> bool {
        self.status_code < 400
    }

    /// Run the backend's response-scope modifiers, mapper and projection,
    /// then the omit-header/omit-body flags. A response is shaped at most once.
    ///
    /// `view` is the endpoint response that `#response.*` values resolve against.
    pub fn apply_config(
        &self,
        request: &Request,
        view: &Response,
        policy: ModifierErrorPolicy,
    ) -> Result<Self, GatewayError> {
        if self.applied {
            return Ok(self.clone());
        }

        let config = &self.config;
        let mut header = self.header.clone();
        let mut body = self.body.clone();

        for (target, modifier) in config.modifiers.in_scope(ModifierScope::Response) {
            let value = dynamic::resolve(&modifier.value, request, view);
            match target {
                ModifierTarget::Header => {
                    header = modify_header(&header, modifier.action, &modifier.key, &value);
                }
                ModifierTarget::Body => {
                    let modified = modify_body(body.as_ref(), modifier.action, &modifier.key, &value);
                    body = policy.recover(modified, body.clone())?;
                }
                ModifierTarget::Query | ModifierTarget::Params => {
                    tracing::debug!(
                        backend = %config.name,
                        key = %modifier.key,
                        "response scope modifier on request-only target ignored"
                    );
                }
            }
        }

        if let Some(current) = body.take() {
            let mapped = policy.recover(current.map_keys(&config.response.mapper), current.clone())?;
            let projected =
                policy.recover(mapped.project(&config.response.projection), mapped.clone())?;
            body = Some(projected);
        }

        if config.response.omit_header {
            header = Header::new();
        }
        if config.response.omit_body {
            body = None;
        }

        Ok(Self {
            header,
            body,
            applied: true,
            ..self.clone()
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "statusCode": self.status_code,
            "header": self.header.to_json(),
            "body": self.body.as_ref().map(Body::to_value).unwrap_or(Value::Null),
        })
    }
}

/// The endpoint response accumulated across beforewares, backends and afterwares.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: u16,
    header: Header,
    body: Option<Body>,
    abort: bool,
    written: bool,
    history: Vec<BackendResponse>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `204 No Content` response.
    pub fn new() -> Self {
        Self {
            status_code: 204,
            header: Header::new(),
            body: None,
            abort: false,
            written: false,
            history: Vec::new(),
        }
    }

    /// An already written response, e.g. one served from cache.
    pub fn written(status_code: u16, header: Header, body: Option<Body>) -> Self {
        Self {
            status_code,
            header,
            body,
            abort: false,
            written: true,
            history: Vec::new(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    /// True once no further backend may run.
    pub fn is_terminal(&self) -> bool {
        self.abort || self.written
    }

    pub fn history(&self) -> &[BackendResponse] {
        &self.history
    }

    /// Record a backend response.
    pub fn append(mut self, backend_response: BackendResponse) -> Self {
        if self.written {
            tracing::warn!("append on a written response ignored");
            return self;
        }
        self.history.push(backend_response);
        self
    }

    /// Terminal response built from the single backend response that triggered the abort.
    pub fn abort_with(self, backend_response: BackendResponse) -> Self {
        if self.written {
            return self;
        }
        Self {
            status_code: backend_response.status_code,
            header: Header::new().aggregate(backend_response.header()),
            body: backend_response.body.clone(),
            abort: true,
            written: false,
            history: self.history,
        }
    }

    /// Terminal error response with the JSON error body.
    pub fn error(self, endpoint: &str, err: &GatewayError) -> Self {
        if self.written {
            return self;
        }
        let body = Body::new(ContentType::Json, err.to_body(endpoint).to_json());
        Self {
            status_code: err.status_code().as_u16(),
            header: Header::new(),
            body: Some(body),
            abort: true,
            written: false,
            history: self.history,
        }
    }

    /// Final state produced by the writer.
    pub(crate) fn finalize(self, status_code: u16, header: Header, body: Option<Body>) -> Self {
        if self.written {
            return self;
        }
        Self {
            status_code,
            header,
            body,
            abort: self.abort,
            written: true,
            history: self.history,
        }
    }

    /// Replace history entries after late shaping. Length never shrinks.
    pub(crate) fn with_history(self, history: Vec<BackendResponse>) -> Self {
        if self.written || history.len() < self.history.len() {
            return self;
        }
        Self { history, ..self }
    }

    /// JSON projection used by `#response.*` dynamic values.
    pub fn to_json(&self) -> Value {
        json!({
            "statusCode": self.status_code,
            "header": self.header.to_json(),
            "body": self.body.as_ref().map(Body::to_value).unwrap_or(Value::Null),
            "history": self.history.iter().map(BackendResponse::to_json).collect::<Vec<_>>(),
        })
    }
}
