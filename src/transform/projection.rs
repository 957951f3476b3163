//! Include/exclude filter over object fields and array indices.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::path::JsonPathEditor;

/// How a set of projection entries filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Keep only the listed keys.
    Addition,
    /// Drop the listed keys.
    Rejection,
    /// Mixed or empty: pass through.
    All,
}

/// Ordered `key → 1|0` entries. Numeric keys address array indices and are
/// classified independently from object keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Projection {
    entries: Vec<(String, bool)>,
}

impl TryFrom<Map<String, Value>> for Projection {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let entries = map
            .into_iter()
            .map(|(key, tag)| match tag {
                Value::Bool(b) => Ok((key, b)),
                Value::Number(n) if n.as_u64() == Some(1) => Ok((key, true)),
                Value::Number(n) if n.as_u64() == Some(0) => Ok((key, false)),
                other => Err(format!("projection '{}' must be 0 or 1, got {}", key, other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}

impl From<Projection> for Map<String, Value> {
    fn from(projection: Projection) -> Self {
        projection
            .entries
            .into_iter()
            .map(|(key, keep)| (key, Value::from(u8::from(keep))))
            .collect()
    }
}

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn classify<'a>(tags: impl Iterator<Item = &'a bool>) -> ProjectionKind {
    let mut seen = false;
    let mut all_keep = true;
    let mut all_drop = true;
    for keep in tags {
        seen = true;
        all_keep &= *keep;
        all_drop &= !*keep;
    }
    match (seen, all_keep, all_drop) {
        (true, true, _) => ProjectionKind::Addition,
        (true, _, true) => ProjectionKind::Rejection,
        _ => ProjectionKind::All,
    }
}

impl Projection {
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, bool)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn field_entries(&self) -> impl Iterator<Item = &(String, bool)> {
        self.entries.iter().filter(|(k, _)| !is_index(k))
    }

    fn index_entries(&self) -> impl Iterator<Item = &(String, bool)> {
        self.entries.iter().filter(|(k, _)| is_index(k))
    }

    /// Classification over non-numeric keys.
    pub fn kind(&self) -> ProjectionKind {
        classify(self.field_entries().map(|(_, keep)| keep))
    }

    /// Classification over numeric keys.
    pub fn index_kind(&self) -> ProjectionKind {
        classify(self.index_entries().map(|(_, keep)| keep))
    }

    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::Object(_) => self.project_object(value),
            Value::Array(items) => {
                let items = self.project_indices(items);
                Value::Array(
                    items
                        .into_iter()
                        .map(|item| {
                            if item.is_object() {
                                self.project_object(item)
                            } else {
                                item
                            }
                        })
                        .collect(),
                )
            }
            other => other,
        }
    }

    fn project_object(&self, value: Value) -> Value {
        match self.kind() {
            ProjectionKind::Addition => {
                let mut projected = Value::Object(Map::new());
                for (key, _) in self.field_entries() {
                    if let Some(found) = value.get_path(key) {
                        if let Err(e) = projected.set_path(key, found.clone()) {
                            tracing::debug!(key = %key, error = %e, "projection key skipped");
                        }
                    }
                }
                projected
            }
            ProjectionKind::Rejection => {
                let mut projected = value;
                for (key, _) in self.field_entries() {
                    projected.delete_path(key);
                }
                projected
            }
            ProjectionKind::All => value,
        }
    }

    fn project_indices(&self, items: Vec<Value>) -> Vec<Value> {
        let listed = |idx: usize| {
            self.index_entries()
                .any(|(key, _)| key.parse::<usize>().ok() == Some(idx))
        };
        match self.index_kind() {
            ProjectionKind::Addition => items
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| listed(*idx))
                .map(|(_, item)| item)
                .collect(),
            ProjectionKind::Rejection => items
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| !listed(*idx))
                .map(|(_, item)| item)
                .collect(),
            ProjectionKind::All => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification() {
        assert_eq!(Projection::new([("a", true), ("b", true)]).kind(), ProjectionKind::Addition);
        assert_eq!(Projection::new([("a", false)]).kind(), ProjectionKind::Rejection);
        assert_eq!(Projection::new([("a", true), ("b", false)]).kind(), ProjectionKind::All);
        assert_eq!(Projection::new([("0", true)]).kind(), ProjectionKind::All);
        assert_eq!(Projection::new([("0", true)]).index_kind(), ProjectionKind::Addition);
    }

    #[test]
    fn test_addition_keeps_only_listed() {
        let projection = Projection::new([("id", true), ("profile.name", true)]);
        let value = json!({"id": 1, "secret": "x", "profile": {"name": "Ana", "age": 30}});

        assert_eq!(
            projection.apply(value),
            json!({"id": 1, "profile": {"name": "Ana"}})
        );
    }

    #[test]
    fn test_rejection_drops_listed() {
        let projection = Projection::new([("secret", false)]);
        let value = json!({"id": 1, "secret": "x"});

        assert_eq!(projection.apply(value), json!({"id": 1}));
    }

    #[test]
    fn test_mixed_passes_through() {
        let projection = Projection::new([("id", true), ("secret", false)]);
        let value = json!({"id": 1, "secret": "x"});

        assert_eq!(projection.apply(value.clone()), value);
    }

    #[test]
    fn test_array_indices_and_elements() {
        let projection = Projection::new([("0", true), ("2", true), ("id", true)]);
        let value = json!([{"id": 1, "x": 0}, {"id": 2}, {"id": 3, "x": 0}]);

        assert_eq!(projection.apply(value), json!([{"id": 1}, {"id": 3}]));
    }

    #[test]
    fn test_deserialize_tags() {
        let projection: Projection = serde_json::from_value(json!({"id": 1, "token": 0})).unwrap();
        assert_eq!(projection.kind(), ProjectionKind::All);
        assert!(serde_json::from_value::<Projection>(json!({"id": 2})).is_err());
    }
}
