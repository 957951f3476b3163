//! Endpoint lookup.
//!
//! # Responsibilities
//! - Store compiled endpoint templates
//! - Look up the endpoint for a method and path
//! - Distinguish "no such path" (404) from "path without this method" (405)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) template scan (acceptable for typical endpoint counts)
//! - More literal segments win; ties keep configuration order

use crate::config::schema::EndpointConfig;
use crate::error::{ErrorKind, GatewayError};
use crate::model::Params;
use crate::routing::matcher::PathTemplate;

#[derive(Debug, Clone)]
struct Route {
    template: PathTemplate,
    method: String,
    endpoint: usize,
}

/// Successful lookup: index into the configured endpoints plus path params.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub endpoint: usize,
    pub params: Params,
}

#[derive(Debug, Clone, Default)]
pub struct EndpointRouter {
    routes: Vec<Route>,
}

impl EndpointRouter {
    pub fn new(endpoints: &[EndpointConfig]) -> Self {
        let mut routes: Vec<Route> = endpoints
            .iter()
            .enumerate()
            .map(|(endpoint, config)| Route {
                template: PathTemplate::parse(&config.path),
                method: config.method.to_ascii_uppercase(),
                endpoint,
            })
            .collect();
        routes.sort_by(|a, b| b.template.specificity().cmp(&a.template.specificity()));
        for route in &routes {
            tracing::debug!(
                method = %route.method,
                path = route.template.as_str(),
                endpoint = route.endpoint,
                "Registered route"
            );
        }
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn lookup(&self, method: &str, path: &str) -> Result<RouteMatch, GatewayError> {
        let mut path_matched = false;
        for route in &self.routes {
            if let Some(params) = route.template.matches(path) {
                if route.method.eq_ignore_ascii_case(method) {
                    return Ok(RouteMatch {
                        endpoint: route.endpoint,
                        params,
                    });
                }
                path_matched = true;
            }
        }

        if path_matched {
            Err(GatewayError::new(
                ErrorKind::MethodNotAllowed,
                format!("method {} not allowed on {}", method, path),
            ))
        } else {
            Err(GatewayError::new(
                ErrorKind::NotFound,
                format!("no endpoint matches {}", path),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(method: &str, path: &str) -> EndpointConfig {
        EndpointConfig {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup() {
        let router = EndpointRouter::new(&[
            endpoint("GET", "/users/:id"),
            endpoint("GET", "/users/me"),
            endpoint("POST", "/users"),
        ]);

        let found = router.lookup("GET", "/users/me").unwrap();
        assert_eq!(found.endpoint, 1);

        let found = router.lookup("get", "/users/42").unwrap();
        assert_eq!(found.endpoint, 0);
        assert_eq!(found.params.get("id"), Some("42"));
    }

    #[test]
    fn test_not_found_vs_method_not_allowed() {
        let router = EndpointRouter::new(&[endpoint("POST", "/users")]);

        let err = router.lookup("GET", "/users").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);

        let err = router.lookup("GET", "/orders").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
