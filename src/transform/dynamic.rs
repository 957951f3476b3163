//! `#request.*` / `#response.*` placeholder resolution.
//!
//! A placeholder is resolved against the JSON view of the live request or
//! response (`header`, `params`, `query`, `body`, `history`). Placeholders
//! that do not resolve are left in the template untouched.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::path::JsonPathEditor;
use crate::model::{Request, Response};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[a-zA-Z0-9_.\-\[\]]+").expect("placeholder regex"));

const REQUEST_PREFIX: &str = "#request.";
const RESPONSE_PREFIX: &str = "#response.";

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute every resolvable placeholder of `template`, left to right.
pub fn resolve(template: &str, request: &Request, response: &Response) -> String {
    if !template.contains('#') {
        return template.to_string();
    }

    let mut request_view: Option<Value> = None;
    let mut response_view: Option<Value> = None;
    let mut resolved = template.to_string();

    for found in PLACEHOLDER.find_iter(template) {
        let word = found.as_str();
        let value = if let Some(path) = word.strip_prefix(REQUEST_PREFIX) {
            request_view
                .get_or_insert_with(|| request.to_json())
                .get_path(path)
                .map(stringify)
        } else if let Some(path) = word.strip_prefix(RESPONSE_PREFIX) {
            response_view
                .get_or_insert_with(|| response.to_json())
                .get_path(path)
                .map(stringify)
        } else {
            None
        };

        match value {
            Some(value) => resolved = resolved.replacen(word, &value, 1),
            None => tracing::debug!(placeholder = %word, "dynamic value not resolved"),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Body, Header, Params};
    use serde_json::json;

    fn request() -> Request {
        Request::new("POST", "http://gw/users/7", "/users/:id")
            .with_params(Params::from_pairs([("id", "7")]))
            .with_header(Header::from_pairs([("X-Tenant", "acme")]))
            .with_body(Some(Body::json(&json!({"id": 42, "user": {"name": "Ana"}}))))
    }

    #[test]
    fn test_resolves_request_body_value() {
        let resolved = resolve("#request.body.id", &request(), &Response::new());
        assert_eq!(resolved, "42");
    }

    #[test]
    fn test_strings_are_unquoted() {
        let resolved = resolve(
            "Hello #request.body.user.name from #request.params.id",
            &request(),
            &Response::new(),
        );
        assert_eq!(resolved, "Hello Ana from 7");
    }

    #[test]
    fn test_header_index() {
        let resolved = resolve("#request.header.X-Tenant[0]", &request(), &Response::new());
        assert_eq!(resolved, "acme");
    }

    #[test]
    fn test_unresolved_left_unchanged() {
        let template = "id=#request.body.missing";
        assert_eq!(resolve(template, &request(), &Response::new()), template);
        assert_eq!(resolve("#other.value", &request(), &Response::new()), "#other.value");
    }

    #[test]
    fn test_resolves_response_status() {
        let resolved = resolve("#response.statusCode", &request(), &Response::new());
        assert_eq!(resolved, "204");
    }
}
