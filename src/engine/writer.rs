//! Response aggregator/writer.
//!
//! # Responsibilities
//! - Late response shaping of backends configured with `apply = LATE`
//! - Drop omitted entries, compute completeness and success
//! - Aggregate or list multiple bodies, or pass a single one through
//! - Endpoint shaping: omit-empty, then case, then encoding

use crate::config::schema::EndpointConfig;
use crate::error::GatewayError;
use crate::model::header::{X_GATEWAY_COMPLETE, X_GATEWAY_SUCCESS};
use crate::model::{BackendResponse, Body, Header, Request, Response};
use crate::transform::aggregate::{aggregate_responses, list_responses};
use crate::transform::ModifierErrorPolicy;

/// Finalize a response. Aborted or written responses are returned untouched.
pub fn write(
    endpoint: &EndpointConfig,
    policy: ModifierErrorPolicy,
    request: &Request,
    response: Response,
) -> Response {
    if response.is_terminal() {
        return response;
    }

    let response = match apply_late(policy, request, response) {
        Ok(response) => response,
        Err((response, e)) => return response.error(&endpoint.path, &e),
    };

    match assemble(endpoint, policy, response.history()) {
        Ok((status_code, header, body)) => response.finalize(status_code, header, body),
        Err(e) => {
            tracing::warn!(endpoint = %endpoint.id(), error = %e, "Response could not be written");
            response.error(&endpoint.path, &e)
        }
    }
}

fn apply_late(
    policy: ModifierErrorPolicy,
    request: &Request,
    response: Response,
) -> Result<Response, (Response, GatewayError)> {
    if response.history().iter().all(BackendResponse::applied) {
        return Ok(response);
    }
    let mut history = Vec::with_capacity(response.history().len());
    for entry in response.history() {
        match entry.apply_config(request, &response, policy) {
            Ok(applied) => history.push(applied),
            Err(e) => return Err((response, e)),
        }
    }
    Ok(response.with_history(history))
}

fn assemble(
    endpoint: &EndpointConfig,
    policy: ModifierErrorPolicy,
    history: &[BackendResponse],
) -> Result<(u16, Header, Option<Body>), GatewayError> {
    let retained: Vec<&BackendResponse> = if history.len() > 1 {
        history.iter().filter(|r| !r.omit()).collect()
    } else {
        history.iter().collect()
    };

    let complete = history.len() == endpoint.effective.backend_count;
    let success = retained.iter().all(|r| r.ok());

    let Some(last) = retained.last() else {
        return Err(GatewayError::responded_nothing());
    };

    let (status_code, body) = if endpoint.effective.backend_count > 1 && retained.len() > 1 {
        let value = if endpoint.response.aggregate {
            aggregate_responses(retained.iter().copied())
        } else {
            list_responses(retained.iter().copied())
        };
        (200, Some(Body::json(&value)))
    } else {
        (last.status_code(), last.body().cloned())
    };

    let header = retained.iter().fold(
        Header::new()
            .set(X_GATEWAY_COMPLETE, complete.to_string())
            .set(X_GATEWAY_SUCCESS, success.to_string()),
        |header, r| header.aggregate(r.header()),
    );

    let body = match body {
        Some(body) => Some(shape(endpoint, policy, body)?),
        None => None,
    };

    Ok((status_code, header, body))
}

fn shape(
    endpoint: &EndpointConfig,
    policy: ModifierErrorPolicy,
    body: Body,
) -> Result<Body, GatewayError> {
    let config = &endpoint.response;
    let mut body = body;
    if config.omit_empty {
        body = policy.recover(body.omit_empty(), body.clone())?;
    }
    if let Some(nomenclature) = config.nomenclature {
        body = policy.recover(body.to_case(nomenclature), body.clone())?;
    }
    if let Some(encode) = config.encode {
        body = policy.recover(body.encode_as(encode), body.clone())?;
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ApplyMoment, BackendConfig, EffectiveSettings};
    use crate::model::ContentType;
    use crate::transform::{Nomenclature, Projection};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn endpoint(backend_count: usize) -> EndpointConfig {
        EndpointConfig {
            path: "/users".into(),
            effective: EffectiveSettings {
                backend_count,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn backend(config: BackendConfig, status: u16, body: Value) -> BackendResponse {
        BackendResponse::new(
            Arc::new(config),
            status,
            Header::from_pairs([("X-Backend", "yes")]),
            Some(Body::json(&body)),
        )
    }

    fn plain() -> BackendConfig {
        BackendConfig {
            name: "b".into(),
            hosts: vec!["h".into()],
            ..Default::default()
        }
    }

    fn request() -> Request {
        Request::new("GET", "http://gw/users", "/users")
    }

    #[test]
    fn test_single_response_passes_through() {
        let response = Response::new().append(backend(plain(), 201, json!({"id": 1})));
        let written = write(&endpoint(1), ModifierErrorPolicy::FailOpen, &request(), response);

        assert!(written.is_written());
        assert_eq!(written.status_code(), 201);
        assert_eq!(written.header().get(X_GATEWAY_COMPLETE), Some("true"));
        assert_eq!(written.header().get(X_GATEWAY_SUCCESS), Some("true"));
        assert_eq!(written.header().get("X-Backend"), Some("yes"));
        assert_eq!(written.body().unwrap().to_value(), json!({"id": 1}));
    }

    #[test]
    fn test_multiple_responses_listed() {
        let response = Response::new()
            .append(backend(plain(), 200, json!({"id": 1})))
            .append(backend(plain(), 404, json!({"error": "x"})));
        let written = write(&endpoint(3), ModifierErrorPolicy::FailOpen, &request(), response);

        assert_eq!(written.status_code(), 200);
        assert_eq!(written.header().get(X_GATEWAY_COMPLETE), Some("false"));
        assert_eq!(written.header().get(X_GATEWAY_SUCCESS), Some("false"));
        assert_eq!(
            written.body().unwrap().to_value(),
            json!([{"id": 1}, {"error": "x"}])
        );
    }

    #[test]
    fn test_omitted_entries_dropped_only_with_siblings() {
        let mut hidden = plain();
        hidden.response.omit = true;

        let alone = Response::new().append(backend(hidden.clone(), 200, json!({"auth": true})));
        let written = write(&endpoint(1), ModifierErrorPolicy::FailOpen, &request(), alone);
        assert_eq!(written.body().unwrap().to_value(), json!({"auth": true}));

        let with_sibling = Response::new()
            .append(backend(hidden, 200, json!({"auth": true})))
            .append(backend(plain(), 200, json!({"id": 1})));
        let written = write(&endpoint(2), ModifierErrorPolicy::FailOpen, &request(), with_sibling);
        assert_eq!(written.body().unwrap().to_value(), json!({"id": 1}));
        assert_eq!(written.header().get(X_GATEWAY_COMPLETE), Some("true"));
    }

    #[test]
    fn test_everything_omitted_is_internal_error() {
        let mut hidden = plain();
        hidden.response.omit = true;
        let response = Response::new()
            .append(backend(hidden.clone(), 200, json!({})))
            .append(backend(hidden, 200, json!({})));

        let written = write(&endpoint(2), ModifierErrorPolicy::FailOpen, &request(), response);
        assert_eq!(written.status_code(), 500);
        assert!(written.is_aborted());
    }

    #[test]
    fn test_late_projection_and_shaping() {
        let mut late = plain();
        late.response.apply = ApplyMoment::Late;
        late.response.projection = Projection::new([("userName", true)]);

        let mut endpoint = endpoint(1);
        endpoint.response.nomenclature = Some(Nomenclature::Snake);
        endpoint.response.encode = Some(ContentType::Yaml);

        let response =
            Response::new().append(backend(late, 200, json!({"userName": "ana", "password": "x"})));
        let written = write(&endpoint, ModifierErrorPolicy::FailOpen, &request(), response);

        let body = written.body().unwrap();
        assert_eq!(body.content_type(), ContentType::Yaml);
        assert_eq!(body.to_value(), json!({"user_name": "ana"}));
        assert!(written.history()[0].applied());
    }

    #[test]
    fn test_written_response_untouched() {
        let response = Response::written(200, Header::new(), Some(Body::text("cached")));
        let written = write(&endpoint(1), ModifierErrorPolicy::FailOpen, &request(), response.clone());
        assert_eq!(written, response);
    }
}
