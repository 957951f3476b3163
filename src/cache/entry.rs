//! Serialized form of a written response.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::store::CacheError;
use crate::model::header::{X_GATEWAY_CACHE, X_GATEWAY_CACHE_TTL};
use crate::model::{Body, ContentType, Header, Response};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status_code: u16,
    pub header: Vec<(String, Vec<String>)>,
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub mime: Option<String>,
    pub body: Option<String>,
}

impl CachedResponse {
    pub fn from_response(response: &Response) -> Self {
        let header = response
            .header()
            .delete(X_GATEWAY_CACHE)
            .delete(X_GATEWAY_CACHE_TTL)
            .iter()
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        Self {
            status_code: response.status_code(),
            header,
            content_type: response.body().map(Body::content_type),
            mime: response.body().map(|b| b.mime().to_string()),
            body: response.body().map(Body::as_text),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(raw: &[u8]) -> Result<Self, CacheError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Rebuild the written response, flagged as served from cache with `ttl` left.
    pub fn into_response(self, ttl: Duration) -> Response {
        let header = Header::from_pairs(
            self.header
                .into_iter()
                .flat_map(|(name, values)| values.into_iter().map(move |v| (name.clone(), v))),
        )
        .set(X_GATEWAY_CACHE, "true")
        .set(X_GATEWAY_CACHE_TTL, ttl.as_secs().to_string());

        let content_type = self.content_type.unwrap_or(ContentType::Text);
        let body = self.body.map(|text| match (&self.mime, content_type) {
            (Some(mime), ContentType::Text) => Body::from_mime(mime, text),
            _ => Body::new(content_type, text),
        });

        Response::written(self.status_code, header, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cached_response_carries_cache_headers() {
        let original = Response::written(
            200,
            Header::new().set("X-Gateway-Complete", "true"),
            Some(Body::json(&json!({"id": 1}))),
        );

        let raw = CachedResponse::from_response(&original).encode().unwrap();
        let served = CachedResponse::decode(&raw)
            .unwrap()
            .into_response(Duration::from_secs(42));

        assert!(served.is_written());
        assert_eq!(served.status_code(), 200);
        assert_eq!(served.header().get(X_GATEWAY_CACHE), Some("true"));
        assert_eq!(served.header().get(X_GATEWAY_CACHE_TTL), Some("42"));
        assert_eq!(served.header().get("X-Gateway-Complete"), Some("true"));
        assert_eq!(served.body().unwrap().content_type(), ContentType::Json);
        assert_eq!(served.body().unwrap().to_value(), json!({"id": 1}));
    }

    #[test]
    fn test_cached_text_keeps_mime() {
        let original = Response::written(200, Header::new(), Some(Body::from_mime("text/html", "<b>hi</b>")));

        let raw = CachedResponse::from_response(&original).encode().unwrap();
        let served = CachedResponse::decode(&raw)
            .unwrap()
            .into_response(Duration::from_secs(1));

        assert_eq!(served.body().unwrap().mime(), "text/html");
        assert_eq!(served.body().unwrap().as_text(), "<b>hi</b>");
    }
}
