//! ADD / APD / SET / RPL / DEL over header, query, params and body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::JsonPathEditor;
use super::TransformError;
use crate::model::{Body, Header, Params, Query};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierAction {
    /// Set when absent, concatenate when present.
    #[serde(rename = "ADD")]
    Add,
    /// Concatenate only when the key already holds a value.
    #[serde(rename = "APD", alias = "APPEND")]
    Append,
    #[serde(rename = "SET")]
    Set,
    /// Overwrite only when the key already holds a value.
    #[serde(rename = "RPL", alias = "REPLACE")]
    Replace,
    #[serde(rename = "DEL", alias = "DELETE")]
    Delete,
}

impl std::fmt::Display for ModifierAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModifierAction::Add => "ADD",
            ModifierAction::Append => "APD",
            ModifierAction::Set => "SET",
            ModifierAction::Replace => "RPL",
            ModifierAction::Delete => "DEL",
        };
        write!(f, "{}", s)
    }
}

/// Flatten both values into one array, dropping nulls and empty strings.
fn concat(current: Value, value: Value) -> Value {
    let flatten = |v: Value| match v {
        Value::Array(items) => items,
        other => vec![other],
    };
    let items = flatten(current)
        .into_iter()
        .chain(flatten(value))
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
        .collect();
    Value::Array(items)
}

/// Apply one action to a JSON tree at `key`. An empty key is a no-op.
pub fn modify_json(
    mut tree: Value,
    action: ModifierAction,
    key: &str,
    value: Value,
) -> Result<Value, TransformError> {
    if key.trim().is_empty() {
        return Ok(tree);
    }

    let existing = tree.get_path(key).filter(|v| !v.is_null()).cloned();
    match action {
        ModifierAction::Add => match existing {
            Some(current) => tree.set_path(key, concat(current, value))?,
            None => tree.set_path(key, value)?,
        },
        ModifierAction::Append => {
            if let Some(current) = existing {
                tree.set_path(key, concat(current, value))?;
            }
        }
        ModifierAction::Set => tree.set_path(key, value)?,
        ModifierAction::Replace => {
            if existing.is_some() {
                tree.set_path(key, value)?;
            }
        }
        ModifierAction::Delete => {
            tree.delete_path(key);
        }
    }
    Ok(tree)
}

pub fn modify_header(header: &Header, action: ModifierAction, key: &str, value: &str) -> Header {
    if key.is_empty() {
        return header.clone();
    }
    match action {
        ModifierAction::Add => header.add(key, value),
        ModifierAction::Append => header.append(key, value),
        ModifierAction::Set => header.set(key, value),
        ModifierAction::Replace => header.replace(key, value),
        ModifierAction::Delete => header.delete(key),
    }
}

pub fn modify_query(query: &Query, action: ModifierAction, key: &str, value: &str) -> Query {
    if key.is_empty() {
        return query.clone();
    }
    match action {
        ModifierAction::Add => query.add(key, value),
        ModifierAction::Append => query.append(key, value),
        ModifierAction::Set => query.set(key, value),
        ModifierAction::Replace => query.replace(key, value),
        ModifierAction::Delete => query.delete(key),
    }
}

/// Params hold a single value per name: ADD only fills a missing param and
/// APD extends an existing one.
pub fn modify_params(params: &Params, action: ModifierAction, key: &str, value: &str) -> Params {
    if key.is_empty() {
        return params.clone();
    }
    match (action, params.get(key)) {
        (ModifierAction::Add, None) | (ModifierAction::Set, _) => params.set(key, value),
        (ModifierAction::Append, Some(current)) => params.set(key, format!("{}{}", current, value)),
        (ModifierAction::Replace, Some(_)) => params.set(key, value),
        (ModifierAction::Delete, _) => params.delete(key),
        _ => params.clone(),
    }
}

/// Modify an optional body. A missing body is created by ADD/SET only:
/// as JSON when a key is given, as text otherwise.
pub fn modify_body(
    body: Option<&Body>,
    action: ModifierAction,
    key: &str,
    value: &str,
) -> Result<Option<Body>, TransformError> {
    match body {
        Some(body) => body.modify(action, key, value).map(Some),
        None => match action {
            ModifierAction::Add | ModifierAction::Set if key.is_empty() => {
                Ok(Some(Body::text(value)))
            }
            ModifierAction::Add | ModifierAction::Set => {
                Body::json(&Value::Object(Default::default()))
                    .modify(action, key, value)
                    .map(Some)
            }
            _ => Ok(None),
        },
    }
}
