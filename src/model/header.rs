//! Multi-value, case-insensitive header map.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const X_REQUEST_ID: &str = "X-Request-Id";
pub const X_GATEWAY_COMPLETE: &str = "X-Gateway-Complete";
pub const X_GATEWAY_SUCCESS: &str = "X-Gateway-Success";
pub const X_GATEWAY_CACHE: &str = "X-Gateway-Cache";
pub const X_GATEWAY_CACHE_TTL: &str = "X-Gateway-Cache-Ttl";

/// Hop-by-hop headers never forwarded between client, gateway and backends.
const HOP_BY_HOP: [&str; 8] = [
    "Connection",
    "Keep-Alive",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "Te",
    "Trailer",
    "Transfer-Encoding",
    "Upgrade",
];

/// Canonical form of a header name (`x-request-id` → `X-Request-Id`).
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.trim().chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Immutable header collection. Every modifying method returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    values: BTreeMap<String, Vec<String>>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, value)` pairs, preserving repeated names as multiple values.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            values
                .entry(canonical_name(name.as_ref()))
                .or_default()
                .push(value.into());
        }
        Self { values }
    }

    /// First value of a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&canonical_name(name))
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of a header.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(&canonical_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&canonical_name(name))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.values.iter()
    }

    /// Append a value, creating the header if absent.
    pub fn add(&self, name: &str, value: impl Into<String>) -> Self {
        let mut values = self.values.clone();
        values.entry(canonical_name(name)).or_default().push(value.into());
        Self { values }
    }

    /// Append a value only when the header already exists.
    pub fn append(&self, name: &str, value: impl Into<String>) -> Self {
        if !self.contains(name) {
            return self.clone();
        }
        self.add(name, value)
    }

    /// Overwrite all values of a header.
    pub fn set(&self, name: &str, value: impl Into<String>) -> Self {
        let mut values = self.values.clone();
        values.insert(canonical_name(name), vec![value.into()]);
        Self { values }
    }

    /// Overwrite a header only when it already exists.
    pub fn replace(&self, name: &str, value: impl Into<String>) -> Self {
        if !self.contains(name) {
            return self.clone();
        }
        self.set(name, value)
    }

    pub fn delete(&self, name: &str) -> Self {
        let mut values = self.values.clone();
        values.remove(&canonical_name(name));
        Self { values }
    }

    /// Keep only the named headers. `*` keeps everything.
    pub fn filter(&self, names: &[String]) -> Self {
        if names.iter().any(|n| n == "*") {
            return self.clone();
        }
        let wanted: Vec<String> = names.iter().map(|n| canonical_name(n)).collect();
        let values = self
            .values
            .iter()
            .filter(|(k, _)| wanted.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { values }
    }

    /// Drop hop-by-hop headers plus the body-describing ones the gateway recomputes.
    pub fn without_transport(&self) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| {
                !HOP_BY_HOP.contains(&k.as_str())
                    && k.as_str() != CONTENT_LENGTH
                    && k.as_str() != CONTENT_TYPE
                    && k.as_str() != "Content-Encoding"
                    && k.as_str() != "Accept-Encoding"
                    && k.as_str() != "Host"
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { values }
    }

    /// Merge another header set into this one, skipping values already present.
    /// `Content-Length` and `Content-Type` are never merged.
    pub fn aggregate(&self, other: &Header) -> Self {
        let mut values = self.values.clone();
        for (name, incoming) in &other.values {
            if name == CONTENT_LENGTH || name == CONTENT_TYPE {
                continue;
            }
            let entry = values.entry(name.clone()).or_default();
            for value in incoming {
                if !entry.contains(value) {
                    entry.push(value.clone());
                }
            }
        }
        Self { values }
    }

    /// Multi-value headers joined for the wire.
    pub fn joined(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.join(", ")))
            .collect()
    }

    /// Total size in bytes of names and values.
    pub fn size(&self) -> usize {
        self.values
            .iter()
            .map(|(k, v)| k.len() + v.iter().map(String::len).sum::<usize>())
            .sum()
    }

    /// JSON projection used by the dynamic value resolver.
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
