//! Typed, immutable message body.
//!
//! A body is a content-type tag plus the raw bytes. Every transformation is a
//! pure `Body -> Body` function delegated to the codec of the content type.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transform::codec::{self, BodyCodec};
use crate::transform::{
    Mapper, ModifierAction, Nomenclature, Projection, TransformError,
};

/// Content types the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    Text,
    Json,
    Xml,
    Yaml,
}

impl ContentType {
    /// Classify a `Content-Type` header value. Unknown types are treated as text.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == "application/json" || essence.ends_with("+json") {
            ContentType::Json
        } else if essence == "application/xml" || essence == "text/xml" || essence.ends_with("+xml")
        {
            ContentType::Xml
        } else if essence.contains("yaml") {
            ContentType::Yaml
        } else {
            ContentType::Text
        }
    }

    /// `Content-Type` header value written for this type.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Text => "text/plain; charset=utf-8",
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
            ContentType::Yaml => "application/x-yaml",
        }
    }

    pub fn codec(&self) -> &'static dyn BodyCodec {
        codec::for_content_type(*self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    content_type: ContentType,
    raw: Bytes,
    /// Original `Content-Type` of a text body (`text/html`, `text/csv`, ...).
    text_mime: Option<String>,
}

impl Body {
    pub fn new(content_type: ContentType, raw: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            raw: raw.into(),
            text_mime: None,
        }
    }

    /// Body typed from a `Content-Type` header value. Text bodies keep the header verbatim.
    pub fn from_mime(mime: &str, raw: impl Into<Bytes>) -> Self {
        let content_type = ContentType::from_mime(mime);
        let text_mime = (content_type == ContentType::Text && !mime.trim().is_empty())
            .then(|| mime.trim().to_string());
        Self {
            content_type,
            raw: raw.into(),
            text_mime,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ContentType::Text, text.into())
    }

    pub fn json(value: &Value) -> Self {
        Self::new(ContentType::Json, value.to_string())
    }

    /// Encode a JSON tree in the given content type.
    pub fn from_value(content_type: ContentType, value: &Value) -> Result<Self, TransformError> {
        let raw = content_type.codec().encode(value)?;
        Ok(Self::new(content_type, raw))
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// `Content-Type` header value to send with this body.
    pub fn mime(&self) -> &str {
        self.text_mime
            .as_deref()
            .unwrap_or_else(|| self.content_type.mime())
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Decode to a JSON tree. Undecodable bodies fall back to their text form.
    pub fn to_value(&self) -> Value {
        self.content_type
            .codec()
            .decode(&self.raw)
            .unwrap_or_else(|_| Value::String(self.as_text()))
    }

    /// Apply one modifier action at `key`.
    pub fn modify(
        &self,
        action: ModifierAction,
        key: &str,
        value: &str,
    ) -> Result<Self, TransformError> {
        let raw = self.content_type.codec().modify(&self.raw, action, key, value)?;
        Ok(self.with_raw(raw))
    }

    pub fn project(&self, projection: &Projection) -> Result<Self, TransformError> {
        if projection.is_empty() {
            return Ok(self.clone());
        }
        self.reshape(|value| projection.apply(value))
    }

    pub fn map_keys(&self, mapper: &Mapper) -> Result<Self, TransformError> {
        if mapper.is_empty() {
            return Ok(self.clone());
        }
        self.reshape(|value| mapper.apply(value))
    }

    pub fn to_case(&self, nomenclature: Nomenclature) -> Result<Self, TransformError> {
        self.reshape(|value| nomenclature.apply(value))
    }

    pub fn omit_empty(&self) -> Result<Self, TransformError> {
        self.reshape(crate::transform::omit_empty)
    }

    /// Re-serialize in another content type. Conversions are structural.
    pub fn encode_as(&self, target: ContentType) -> Result<Self, TransformError> {
        if target == self.content_type {
            return Ok(self.clone());
        }
        let value = self.content_type.codec().decode(&self.raw)?;
        Self::from_value(target, &value)
    }

    fn reshape(&self, f: impl Fn(Value) -> Value) -> Result<Self, TransformError> {
        let raw = self.content_type.codec().reshape(&self.raw, &f)?;
        Ok(self.with_raw(raw))
    }

    fn with_raw(&self, raw: impl Into<Bytes>) -> Self {
        Self {
            content_type: self.content_type,
            raw: raw.into(),
            text_mime: self.text_mime.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_from_mime() {
        assert_eq!(
            ContentType::from_mime("application/json; charset=utf-8"),
            ContentType::Json
        );
        assert_eq!(
            ContentType::from_mime("application/problem+json"),
            ContentType::Json
        );
        assert_eq!(ContentType::from_mime("text/xml"), ContentType::Xml);
        assert_eq!(ContentType::from_mime("application/x-yaml"), ContentType::Yaml);
        assert_eq!(ContentType::from_mime("text/html"), ContentType::Text);
    }

    #[test]
    fn test_json_set_then_get() {
        let body = Body::json(&json!({"id": 1}));
        let modified = body.modify(ModifierAction::Set, "user.name", "\"Ana\"").unwrap();

        assert_eq!(modified.to_value()["user"]["name"], "Ana");
        assert_eq!(body.to_value(), json!({"id": 1}));
    }

    #[test]
    fn test_value_parsed_as_json_when_possible() {
        let body = Body::json(&json!({}));

        let number = body.modify(ModifierAction::Set, "count", "5").unwrap();
        assert_eq!(number.to_value()["count"], json!(5));

        let literal = body.modify(ModifierAction::Set, "name", "plain text").unwrap();
        assert_eq!(literal.to_value()["name"], json!("plain text"));
    }

    #[test]
    fn test_encode_as_xml_is_structural() {
        let body = Body::json(&json!({"user": {"id": 1, "name": "Ana"}}));
        let xml = body.encode_as(ContentType::Xml).unwrap();

        assert_eq!(xml.content_type(), ContentType::Xml);
        let text = xml.as_text();
        assert!(text.contains("<user>"));
        assert!(text.contains("<id>1</id>"));
        assert!(text.contains("<name>Ana</name>"));
    }

    #[test]
    fn test_encode_as_yaml() {
        let body = Body::json(&json!({"name": "Ana"}));
        let yaml = body.encode_as(ContentType::Yaml).unwrap();

        assert!(yaml.as_text().contains("name: Ana"));
        assert_eq!(yaml.to_value(), json!({"name": "Ana"}));
    }

    #[test]
    fn test_text_body_keeps_original_mime() {
        let html = Body::from_mime("text/html; charset=utf-8", "<p>hi</p>");
        assert_eq!(html.content_type(), ContentType::Text);
        assert_eq!(html.mime(), "text/html; charset=utf-8");

        let edited = html.modify(ModifierAction::Replace, "hi", "hello").unwrap();
        assert_eq!(edited.as_text(), "<p>hello</p>");
        assert_eq!(edited.mime(), "text/html; charset=utf-8");

        let json = Body::from_mime("application/problem+json", "{}");
        assert_eq!(json.mime(), "application/json");
        assert_eq!(Body::text("x").mime(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_invalid_json_falls_back_to_text_value() {
        let body = Body::new(ContentType::Json, "not json");
        assert_eq!(body.to_value(), json!("not json"));
    }
}
