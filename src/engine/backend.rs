//! Backend executor: one outbound call and its bookkeeping.

use std::sync::Arc;

use crate::config::schema::{
    ApplyMoment, BackendConfig, EndpointConfig, Modifier, ModifierScope, ModifierTarget,
};
use crate::engine::transport::{OutboundRequest, Transport};
use crate::engine::ExecutionContext;
use crate::error::GatewayError;
use crate::model::header::X_REQUEST_ID;
use crate::model::{BackendRequest, BackendResponse, Request, Response};
use crate::observability::metrics;
use crate::transform::dynamic;
use crate::transform::modifier::{modify_body, modify_header, modify_params, modify_query};
use crate::transform::ModifierErrorPolicy;

#[derive(Clone)]
pub struct BackendService {
    transport: Arc<dyn Transport>,
    policy: ModifierErrorPolicy,
}

impl BackendService {
    pub fn new(transport: Arc<dyn Transport>, policy: ModifierErrorPolicy) -> Self {
        Self { transport, policy }
    }

    /// Run one backend against the running request/response pair.
    ///
    /// Transport failures and fail-closed transformation errors produce a
    /// terminal error response.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        endpoint: &EndpointConfig,
        backend: &Arc<BackendConfig>,
        request: Request,
        response: Response,
    ) -> (Request, Response) {
        let propagated = self.request_modifiers(backend, true);
        let request = match self.modify_request(request, &propagated, None, &response) {
            Ok(request) => request,
            Err((request, e)) => return (request, response.error(&endpoint.path, &e)),
        };

        let backend_request = match self.snapshot(ctx, backend, &request, &response) {
            Ok(snapshot) => snapshot,
            Err(e) => return (request, response.error(&endpoint.path, &e)),
        };
        let request = request.append_history(backend_request.clone());

        let outbound = OutboundRequest {
            method: backend_request.method().to_string(),
            url: backend_request.url(),
            header: backend_request.header().clone(),
            body: backend_request.body().cloned(),
            timeout: ctx.remaining(),
        };

        tracing::debug!(
            backend = %backend.name,
            method = %outbound.method,
            url = %outbound.url,
            request_id = %ctx.request_id(),
            "Calling backend"
        );

        let raw = match self.transport.make_request(outbound).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(backend = %backend.name, error = %e, "Backend call failed");
                metrics::record_backend_call(&backend.name, None);
                let err = e.into_gateway_error();
                return (request, response.error(&endpoint.path, &err));
            }
        };
        metrics::record_backend_call(&backend.name, Some(raw.status_code));

        let mut backend_response = BackendResponse::new(
            backend.clone(),
            raw.status_code,
            raw.header.without_transport(),
            raw.typed_body(),
        );

        if backend.response.apply == ApplyMoment::Early {
            let view = response.clone().append(backend_response.clone());
            backend_response = match backend_response.apply_config(&request, &view, self.policy) {
                Ok(applied) => applied,
                Err(e) => return (request, response.error(&endpoint.path, &e)),
            };
        }

        if endpoint.abort(backend_response.status_code()) {
            tracing::debug!(
                backend = %backend.name,
                status = backend_response.status_code(),
                "Backend status aborts the endpoint"
            );
            return (request, response.abort_with(backend_response));
        }

        (request, response.append(backend_response))
    }

    fn request_modifiers<'a>(
        &self,
        backend: &'a BackendConfig,
        propagate: bool,
    ) -> Vec<(ModifierTarget, &'a Modifier)> {
        backend
            .modifiers
            .in_scope(ModifierScope::Request)
            .filter(|(_, m)| m.propagate == propagate)
            .collect()
    }

    /// Apply request-scope modifiers to `target`. Placeholders resolve against
    /// `view`, or against the request being modified when no view is given.
    fn modify_request(
        &self,
        mut target: Request,
        modifiers: &[(ModifierTarget, &Modifier)],
        view: Option<&Request>,
        response: &Response,
    ) -> Result<Request, (Request, GatewayError)> {
        for (surface, modifier) in modifiers {
            let value = dynamic::resolve(&modifier.value, view.unwrap_or(&target), response);
            let (action, key) = (modifier.action, modifier.key.as_str());
            target = match surface {
                ModifierTarget::Header => {
                    let header = modify_header(target.header(), action, key, &value);
                    target.with_header(header)
                }
                ModifierTarget::Query => {
                    let query = modify_query(target.query(), action, key, &value);
                    target.with_query(query)
                }
                ModifierTarget::Params => {
                    let params = modify_params(target.params(), action, key, &value);
                    target.with_params(params)
                }
                ModifierTarget::Body => {
                    let modified = modify_body(target.body(), action, key, &value);
                    match self.policy.recover(modified, target.body().cloned()) {
                        Ok(body) => target.with_body(body),
                        Err(e) => return Err((target, e)),
                    }
                }
            };
        }
        Ok(target)
    }

    /// Build what is actually sent: forwarded headers/query, non-propagating
    /// modifiers, filled path, request id.
    fn snapshot(
        &self,
        ctx: &ExecutionContext,
        backend: &BackendConfig,
        request: &Request,
        response: &Response,
    ) -> Result<BackendRequest, GatewayError> {
        // Load balancing is out of scope: the last configured host wins.
        let host = backend
            .hosts
            .last()
            .ok_or_else(|| GatewayError::internal(format!("backend {} has no host", backend.name)))?;
        let method = backend
            .method
            .clone()
            .unwrap_or_else(|| request.method().to_string());

        let draft = Request::new(method.as_str(), request.url(), backend.path.as_str())
            .with_params(request.params().clone())
            .with_header(request.header().filter(&backend.forward_headers).without_transport())
            .with_query(request.query().filter(&backend.forward_queries))
            .with_body(request.body().cloned());

        let local = self.request_modifiers(backend, false);
        let draft = self
            .modify_request(draft, &local, Some(request), response)
            .map_err(|(_, e)| e)?;

        Ok(BackendRequest::new(
            host.as_str(),
            draft.params().fill(&backend.path),
            method,
            draft.header().set(X_REQUEST_ID, ctx.request_id()),
            draft.query().clone(),
            draft.params().clone(),
            draft.body().cloned(),
        ))
    }
}
