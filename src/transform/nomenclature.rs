//! Key case conversion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Nomenclature {
    /// `UserName`
    Camel,
    /// `userName`
    LowerCamel,
    /// `user_name`
    Snake,
    /// `USER_NAME`
    ScreamingSnake,
    /// `user-name`
    Kebab,
    /// `USER-NAME`
    ScreamingKebab,
}

/// Split a key into lowercase words on separators, case changes and acronym ends.
fn words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Nomenclature {
    pub fn convert(&self, key: &str) -> String {
        let words = words(key);
        if words.is_empty() {
            return key.to_string();
        }
        match self {
            Nomenclature::Camel => words.iter().map(|w| capitalize(w)).collect(),
            Nomenclature::LowerCamel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
                .collect(),
            Nomenclature::Snake => words.join("_"),
            Nomenclature::ScreamingSnake => words.join("_").to_uppercase(),
            Nomenclature::Kebab => words.join("-"),
            Nomenclature::ScreamingKebab => words.join("-").to_uppercase(),
        }
    }

    /// Rewrite every object key of a tree, leaving values untouched.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (self.convert(&k), self.apply(v)))
                    .collect::<Map<String, Value>>(),
            ),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
            other => other,
        }
    }
}
