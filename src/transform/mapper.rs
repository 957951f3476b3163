//! Field renames.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered `old → new` renames applied to every object in a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Mapper {
    renames: Vec<(String, String)>,
}

impl TryFrom<Map<String, Value>> for Mapper {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let renames = map
            .into_iter()
            .map(|(old, new)| match new {
                Value::String(new) => Ok((old, new)),
                other => Err(format!("mapper target for '{}' must be a string, got {}", old, other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { renames })
    }
}

impl From<Mapper> for Map<String, Value> {
    fn from(mapper: Mapper) -> Self {
        mapper
            .renames
            .into_iter()
            .map(|(old, new)| (old, Value::String(new)))
            .collect()
    }
}

impl Mapper {
    pub fn new<K: Into<String>, V: Into<String>>(renames: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            renames: renames
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut map: Map<String, Value> =
                    map.into_iter().map(|(k, v)| (k, self.apply(v))).collect();
                for (old, new) in &self.renames {
                    if old != new && map.contains_key(old) {
                        map = rename(map, old, new);
                    }
                }
                Value::Object(map)
            }
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
            other => other,
        }
    }
}

/// Move `old` to `new` at the position of `old`. An existing `new` is overwritten.
fn rename(map: Map<String, Value>, old: &str, new: &str) -> Map<String, Value> {
    let mut renamed = Map::with_capacity(map.len());
    for (key, value) in map {
        if key == old {
            renamed.insert(new.to_string(), value);
        } else if key != new {
            renamed.insert(key, value);
        }
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renames_recursively() {
        let mapper = Mapper::new([("id", "userId")]);
        let value = json!({"id": 1, "friends": [{"id": 2}], "meta": {"id": 3}});

        assert_eq!(
            mapper.apply(value),
            json!({"userId": 1, "friends": [{"userId": 2}], "meta": {"userId": 3}})
        );
    }

    #[test]
    fn test_rename_keeps_position() {
        let mapper = Mapper::new([("b", "x")]);
        let mapped = mapper.apply(json!({"a": 1, "b": 2, "c": 3}));

        let keys: Vec<&String> = mapped.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "x", "c"]);
    }

    #[test]
    fn test_collision_overwrites_destination() {
        let mapper = Mapper::new([("old", "new")]);
        assert_eq!(
            mapper.apply(json!({"new": 1, "old": 2})),
            json!({"new": 2})
        );
    }

    #[test]
    fn test_same_name_is_noop() {
        let mapper = Mapper::new([("id", "id")]);
        let value = json!({"id": 1});
        assert_eq!(mapper.apply(value.clone()), value);
    }
}
