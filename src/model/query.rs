//! Multi-value query string.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Immutable, ordered query parameters. Keys are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    values: BTreeMap<String, Vec<String>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(raw: &str) -> Self {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
            values.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn add(&self, key: &str, value: impl Into<String>) -> Self {
        let mut values = self.values.clone();
        values.entry(key.to_string()).or_default().push(value.into());
        Self { values }
    }

    pub fn append(&self, key: &str, value: impl Into<String>) -> Self {
        if !self.contains(key) {
            return self.clone();
        }
        self.add(key, value)
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Self {
        let mut values = self.values.clone();
        values.insert(key.to_string(), vec![value.into()]);
        Self { values }
    }

    pub fn replace(&self, key: &str, value: impl Into<String>) -> Self {
        if !self.contains(key) {
            return self.clone();
        }
        self.set(key, value)
    }

    pub fn delete(&self, key: &str) -> Self {
        let mut values = self.values.clone();
        values.remove(key);
        Self { values }
    }

    /// Keep only the named keys. `*` keeps everything.
    pub fn filter(&self, keys: &[String]) -> Self {
        if keys.iter().any(|k| k == "*") {
            return self.clone();
        }
        let values = self
            .values
            .iter()
            .filter(|(k, _)| keys.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { values }
    }

    /// URL-encode, sorted by key.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, vs) in &self.values {
            for v in vs {
                serializer.append_pair(k, v);
            }
        }
        serializer.finish()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    Value::Array(v.iter().cloned().map(Value::String).collect()),
                )
            })
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_encode() {
        let query = Query::parse("tag=a&tag=b&name=John%20Doe");

        assert_eq!(query.get_all("tag"), ["a", "b"]);
        assert_eq!(query.get("name"), Some("John Doe"));
        assert_eq!(query.encode(), "name=John+Doe&tag=a&tag=b");
    }

    #[test]
    fn test_conditional_modifications() {
        let query = Query::parse("page=1");

        assert!(!query.append("size", "10").contains("size"));
        assert_eq!(query.append("page", "2").get_all("page"), ["1", "2"]);
        assert_eq!(query.replace("page", "3").get("page"), Some("3"));
        assert!(query.delete("page").is_empty());
    }

    #[test]
    fn test_filter() {
        let query = Query::parse("a=1&b=2&c=3");
        let filtered = query.filter(&["a".to_string(), "c".to_string()]);

        assert_eq!(filtered.encode(), "a=1&c=3");
    }
}
