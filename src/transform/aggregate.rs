//! Combining several backend bodies into one document.

use serde_json::{Map, Value};

use crate::model::BackendResponse;

fn concat(current: Value, incoming: Value) -> Value {
    let flatten = |v: Value| match v {
        Value::Array(items) => items,
        other => vec![other],
    };
    Value::Array(flatten(current).into_iter().chain(flatten(incoming)).collect())
}

/// Merge two documents. Colliding object keys become arrays of both values;
/// anything other than two objects is concatenated.
pub fn merge(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Object(mut base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match base.get_mut(&key) {
                    Some(existing) => {
                        let current = existing.take();
                        *existing = concat(current, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (Value::Null, incoming) => incoming,
        (base, Value::Null) => base,
        (base, incoming) => concat(base, incoming),
    }
}

/// Nest a whole document under a single key.
pub fn aggregate_by_key(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// One document from every response with a body.
///
/// Grouped bodies nest under their group; array and string bodies go under
/// `response<index>`; object bodies merge their fields, renaming a colliding
/// key to `<key><index>`. `index` is the position among `responses`. If the
/// renamed key is taken too, both values are kept as an array.
pub fn aggregate_responses<'a>(responses: impl IntoIterator<Item = &'a BackendResponse>) -> Value {
    let mut aggregated = Map::new();
    for (index, response) in responses.into_iter().enumerate() {
        let Some(body) = response.body() else {
            continue;
        };
        let value = body.to_value();

        if let Some(group) = response.group() {
            // Backends sharing a group merge into one document.
            match aggregated.get_mut(group) {
                Some(existing) => {
                    let current = existing.take();
                    *existing = merge(current, value);
                }
                None => {
                    aggregated.insert(group.to_string(), value);
                }
            }
            continue;
        }
        match value {
            Value::Object(fields) => {
                for (key, field) in fields {
                    let key = if aggregated.contains_key(&key) {
                        format!("{}{}", key, index)
                    } else {
                        key
                    };
                    // A renamed key can still collide with a field already present.
                    match aggregated.get_mut(&key) {
                        Some(existing) => {
                            let current = existing.take();
                            *existing = concat(current, field);
                        }
                        None => {
                            aggregated.insert(key, field);
                        }
                    }
                }
            }
            other => {
                aggregated.insert(format!("response{}", index), other);
            }
        }
    }
    Value::Object(aggregated)
}

/// Ordered list of bodies. Grouped bodies are wrapped as `{group: body}`.
pub fn list_responses<'a>(responses: impl IntoIterator<Item = &'a BackendResponse>) -> Value {
    Value::Array(
        responses
            .into_iter()
            .map(|response| {
                let value = response.body().map(|b| b.to_value()).unwrap_or(Value::Null);
                match response.group() {
                    Some(group) => aggregate_by_key(group, value),
                    None => value,
                }
            })
            .collect(),
    )
}
