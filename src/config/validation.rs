//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every endpoint has at least one backend, every backend at least one host
//! - Detect duplicate endpoints (same method and path)
//! - Check modifier keys and scopes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Unknown middleware names are not errors; they are skipped with a warning at runtime

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{BackendConfig, GatewayConfig, ModifierScope, ModifierTarget};
use crate::transform::ModifierAction;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint {endpoint}: path must start with '/'")]
    InvalidPath { endpoint: String },

    #[error("endpoint {endpoint}: at least one backend is required")]
    NoBackends { endpoint: String },

    #[error("endpoint {endpoint} is declared more than once")]
    DuplicateEndpoint { endpoint: String },

    #[error("backend {backend}: at least one host is required")]
    NoHosts { backend: String },

    #[error("backend {backend}: {action} modifier on {target} requires a key")]
    EmptyModifierKey {
        backend: String,
        action: ModifierAction,
        target: String,
    },

    #[error("backend {backend}: response scope modifiers only apply to header and body, not {target}")]
    ResponseScopeTarget { backend: String, target: String },
}

fn target_name(target: ModifierTarget) -> String {
    match target {
        ModifierTarget::Header => "header",
        ModifierTarget::Params => "params",
        ModifierTarget::Query => "query",
        ModifierTarget::Body => "body",
    }
    .to_string()
}

fn validate_backend(backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    let name = if backend.name.is_empty() {
        backend.path.clone()
    } else {
        backend.name.clone()
    };

    if backend.hosts.iter().all(|h| h.trim().is_empty()) {
        errors.push(ValidationError::NoHosts {
            backend: name.clone(),
        });
    }

    for scope in [ModifierScope::Request, ModifierScope::Response] {
        for (target, modifier) in backend.modifiers.in_scope(scope) {
            // A text body can be extended or replaced as a whole.
            let keyless_body = target == ModifierTarget::Body
                && matches!(modifier.action, ModifierAction::Add | ModifierAction::Set);
            if modifier.key.trim().is_empty() && !keyless_body {
                errors.push(ValidationError::EmptyModifierKey {
                    backend: name.clone(),
                    action: modifier.action,
                    target: target_name(target),
                });
            }
            if scope == ModifierScope::Response
                && matches!(target, ModifierTarget::Params | ModifierTarget::Query)
            {
                errors.push(ValidationError::ResponseScopeTarget {
                    backend: name.clone(),
                    target: target_name(target),
                });
            }
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for endpoint in &config.endpoints {
        let id = endpoint.id();
        if !endpoint.path.starts_with('/') {
            errors.push(ValidationError::InvalidPath { endpoint: id.clone() });
        }
        if endpoint.backends.is_empty() {
            errors.push(ValidationError::NoBackends { endpoint: id.clone() });
        }
        if !seen.insert(id.clone()) {
            errors.push(ValidationError::DuplicateEndpoint { endpoint: id });
        }
        for backend in &endpoint.backends {
            validate_backend(backend, &mut errors);
        }
    }

    for middleware in config.middlewares.values() {
        validate_backend(middleware, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
