//! Path parameters and path-template substitution.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Resolved path parameters, e.g. `id` → `42` for `/users/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Self {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value.into());
        Self { values }
    }

    pub fn delete(&self, key: &str) -> Self {
        let mut values = self.values.clone();
        values.remove(key);
        Self { values }
    }

    /// Substitute `:name` and `{name}` segments of a path template.
    /// Unknown parameters are left as written.
    pub fn fill(&self, template: &str) -> String {
        template
            .split('/')
            .map(|segment| {
                let name = segment
                    .strip_prefix(':')
                    .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
                    .or_else(|| segment.strip_prefix('*'));
                match name.and_then(|n| self.values.get(n)) {
                    Some(value) => value.clone(),
                    None => segment.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template() {
        let params = Params::from_pairs([("id", "42"), ("slug", "intro")]);

        assert_eq!(params.fill("/users/:id/posts/{slug}"), "/users/42/posts/intro");
        assert_eq!(params.fill("/users/:missing"), "/users/:missing");
        assert_eq!(params.fill("/static"), "/static");
    }

    #[test]
    fn test_set_and_delete() {
        let params = Params::new().set("id", "1");

        assert_eq!(params.get("id"), Some("1"));
        assert!(params.delete("id").is_empty());
        assert_eq!(params.get("id"), Some("1"));
    }
}
