//! JSON path editor.
//!
//! Paths use dots and brackets: `user.name`, `items[0].id`, `$.items.0`.
//! A numeric key addresses an array index when the current node is an array
//! and an object field otherwise.

use serde_json::{Map, Value};

use super::TransformError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    fn as_key(&self) -> String {
        match self {
            Segment::Key(key) => key.clone(),
            Segment::Index(idx) => idx.to_string(),
        }
    }

    fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Key(key) => key.parse().ok(),
            Segment::Index(idx) => Some(*idx),
        }
    }
}

/// Split a path expression into segments.
pub fn parse_path(path: &str) -> Vec<Segment> {
    let path = path.trim();
    let path = path.strip_prefix("$.").unwrap_or(path);
    let path = path.strip_prefix('$').unwrap_or(path);

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                let inner: String = chars.by_ref().take_while(|c| *c != ']').collect();
                let inner = inner.trim_matches(|c| c == '"' || c == '\'');
                match inner.parse::<usize>() {
                    Ok(idx) => segments.push(Segment::Index(idx)),
                    Err(_) if !inner.is_empty() => segments.push(Segment::Key(inner.to_string())),
                    Err(_) => {}
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }
    segments
}

/// Narrow editing surface over a JSON tree.
pub trait JsonPathEditor {
    fn get_path(&self, path: &str) -> Option<&Value>;

    /// Write `value` at `path`, creating intermediate objects/arrays as needed.
    fn set_path(&mut self, path: &str, value: Value) -> Result<(), TransformError>;

    /// Remove the node at `path`. Returns whether something was removed.
    fn delete_path(&mut self, path: &str) -> bool;
}

impl JsonPathEditor for Value {
    fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in parse_path(path) {
            current = step(current, &segment)?;
        }
        Some(current)
    }

    fn set_path(&mut self, path: &str, value: Value) -> Result<(), TransformError> {
        let segments = parse_path(path);
        if segments.is_empty() {
            return Err(TransformError::JsonPath(format!("empty path '{}'", path)));
        }
        set_at(self, &segments, value, path)
    }

    fn delete_path(&mut self, path: &str) -> bool {
        let segments = parse_path(path);
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };

        let mut current = self;
        for segment in parents {
            current = match step_mut(current, segment) {
                Some(next) => next,
                None => return false,
            };
        }

        match current {
            Value::Object(map) => map.shift_remove(&last.as_key()).is_some(),
            Value::Array(items) => match last.as_index() {
                Some(idx) if idx < items.len() => {
                    items.remove(idx);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(&segment.as_key()),
        Value::Array(items) => items.get(segment.as_index()?),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(&segment.as_key()),
        Value::Array(items) => items.get_mut(segment.as_index()?),
        _ => None,
    }
}

/// How many `null` slots a SET may add to reach an array index.
const MAX_ARRAY_PADDING: usize = 1024;

fn empty_container_for(segment: &Segment) -> Value {
    match segment {
        Segment::Index(_) => Value::Array(Vec::new()),
        Segment::Key(_) => Value::Object(Map::new()),
    }
}

fn set_at(
    current: &mut Value,
    segments: &[Segment],
    value: Value,
    path: &str,
) -> Result<(), TransformError> {
    let Some((segment, rest)) = segments.split_first() else {
        *current = value;
        return Ok(());
    };

    if current.is_null() {
        *current = empty_container_for(segment);
    }

    let child = match current {
        Value::Object(map) => map.entry(segment.as_key()).or_insert(Value::Null),
        Value::Array(items) => {
            let idx = segment.as_index().ok_or_else(|| {
                TransformError::JsonPath(format!(
                    "cannot address array with key '{}' in '{}'",
                    segment.as_key(),
                    path
                ))
            })?;
            if idx >= items.len() {
                if idx - items.len() >= MAX_ARRAY_PADDING {
                    return Err(TransformError::JsonPath(format!(
                        "index {} is too far past the end of a {}-item array in '{}'",
                        idx,
                        items.len(),
                        path
                    )));
                }
                items.resize(idx + 1, Value::Null);
            }
            &mut items[idx]
        }
        other => {
            return Err(TransformError::JsonPath(format!(
                "cannot set '{}' through scalar {} in '{}'",
                segment.as_key(),
                other,
                path
            )))
        }
    };

    set_at(child, rest, value, path)
}
