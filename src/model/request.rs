//! Inbound request and per-backend request snapshots.

use serde_json::{json, Value};

use crate::model::{Body, Header, Params, Query};

/// The running request of one orchestration.
///
/// Created once per inbound call. Modifiers with `propagate = true` replace
/// its parts so later backends observe them; `history` records what every
/// backend was actually sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    url: String,
    path: String,
    method: String,
    params: Params,
    header: Header,
    query: Query,
    body: Option<Body>,
    history: Vec<BackendRequest>,
}

impl Request {
    /// `path` is the endpoint template (`/users/:id`), `url` the full inbound URL.
    pub fn new(method: impl Into<String>, url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            method: method.into().to_ascii_uppercase(),
            params: Params::new(),
            header: Header::new(),
            query: Query::new(),
            body: None,
            history: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn history(&self) -> &[BackendRequest] {
        &self.history
    }

    pub fn with_params(self, params: Params) -> Self {
        Self { params, ..self }
    }

    pub fn with_header(self, header: Header) -> Self {
        Self { header, ..self }
    }

    pub fn with_query(self, query: Query) -> Self {
        Self { query, ..self }
    }

    pub fn with_body(self, body: Option<Body>) -> Self {
        Self { body, ..self }
    }

    /// Record the snapshot sent to a backend.
    pub fn append_history(mut self, backend_request: BackendRequest) -> Self {
        self.history.push(backend_request);
        self
    }

    /// JSON projection used by `#request.*` dynamic values.
    pub fn to_json(&self) -> Value {
        json!({
            "header": self.header.to_json(),
            "params": self.params.to_json(),
            "query": self.query.to_json(),
            "body": self.body.as_ref().map(Body::to_value).unwrap_or(Value::Null),
            "history": self.history.iter().map(BackendRequest::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Frozen snapshot of what was sent to one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    host: String,
    path: String,
    method: String,
    header: Header,
    query: Query,
    params: Params,
    body: Option<Body>,
}

impl BackendRequest {
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
        header: Header,
        query: Query,
        params: Params,
        body: Option<Body>,
    ) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            method: method.into().to_ascii_uppercase(),
            header,
            query,
            params,
            body,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Absolute URL of the call: host + path + encoded query.
    pub fn url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        let path = if self.path.starts_with('/') || self.path.is_empty() {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let query = self.query.encode();
        if query.is_empty() {
            format!("{}{}", host, path)
        } else {
            format!("{}{}?{}", host, path, query)
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "host": self.host,
            "path": self.path,
            "method": self.method,
            "header": self.header.to_json(),
            "params": self.params.to_json(),
            "query": self.query.to_json(),
            "body": self.body.as_ref().map(Body::to_value).unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(host: &str, path: &str, query: &str) -> BackendRequest {
        BackendRequest::new(
            host,
            path,
            "get",
            Header::new(),
            Query::parse(query),
            Params::new(),
            None,
        )
    }

    #[test]
    fn test_backend_url() {
        assert_eq!(
            snapshot("localhost:8080", "/users/1", "").url(),
            "http://localhost:8080/users/1"
        );
        assert_eq!(
            snapshot("https://api.example.com/", "users", "page=2").url(),
            "https://api.example.com/users?page=2"
        );
    }

    #[test]
    fn test_history_only_grows() {
        let request = Request::new("get", "http://gw/users", "/users");
        let request = request
            .append_history(snapshot("a:1", "/one", ""))
            .append_history(snapshot("b:1", "/two", ""));

        assert_eq!(request.method(), "GET");
        assert_eq!(request.history().len(), 2);
        assert_eq!(request.history()[1].path(), "/two");
    }

    #[test]
    fn test_json_projection() {
        let request = Request::new("POST", "http://gw/users/7", "/users/:id")
            .with_params(Params::from_pairs([("id", "7")]))
            .with_header(Header::from_pairs([("x-tenant", "acme")]))
            .with_body(Some(Body::json(&json!({"name": "Ana"}))));

        let view = request.to_json();
        assert_eq!(view["params"]["id"], "7");
        assert_eq!(view["header"]["X-Tenant"][0], "acme");
        assert_eq!(view["body"]["name"], "Ana");
        assert_eq!(view["history"], json!([]));

        let keys: Vec<&String> = view.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["header", "params", "query", "body", "history"]);
    }
}
