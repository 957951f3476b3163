//! Path template matching.
//!
//! # Responsibilities
//! - Parse endpoint path templates (`/users/:id`, `/users/{id}`, `/files/*rest`)
//! - Match a request path and extract path parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Trailing slashes are ignored
//! - No regex to guarantee O(n) matching

use crate::model::Params;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    /// Matches the remaining path, possibly empty.
    Wildcard(String),
}

/// A compiled endpoint path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = split(template)
            .map(|segment| {
                if let Some(name) = segment.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Segment::Param(name.to_string())
                } else if let Some(name) = segment.strip_prefix('*') {
                    Segment::Wildcard(name.to_string())
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();
        Self {
            raw: template.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments; more specific templates are tried first.
    pub fn specificity(&self) -> (usize, bool) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let has_wildcard = self.segments.iter().any(|s| matches!(s, Segment::Wildcard(_)));
        (literals, !has_wildcard)
    }

    /// Match `path`, returning the extracted parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split(path).collect();
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).map(|r| r.join("/")).unwrap_or_default();
                    if !name.is_empty() {
                        params = params.set(name, rest);
                    }
                    return Some(params);
                }
                Segment::Literal(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params = params.set(name, *value);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}
