//! Path patterns with named parameters
//!
//! Patterns are plain segment lists: each segment is either a literal
//! (matched byte-for-byte, case-sensitive) or a `:name` parameter matching
//! any single non-`/` segment. There is no glob or trailing wildcard; the
//! segment counts of pattern and path must agree exactly.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("path pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),
    #[error("empty segment in path pattern: {0:?}")]
    EmptySegment(String),
    #[error("unnamed parameter in path pattern: {0:?}")]
    UnnamedParam(String),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let body = pattern
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(pattern.to_string()))?;
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        if body.is_empty() {
            // bare "/" matches only the root path
            return Ok(Self { segments });
        }
        for raw in body.split('/') {
            if raw.is_empty() {
                return Err(PatternError::EmptySegment(pattern.to_string()));
            }
            if let Some(name) = raw.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::UnnamedParam(pattern.to_string()));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }
        Ok(Self { segments })
    }

    /// Match a concrete path, returning the bound parameters on success.
    /// Trailing slashes on the path are ignored.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let body = path.strip_prefix('/')?;
        let body = body.strip_suffix('/').unwrap_or(body);
        let parts: Vec<&str> = if body.is_empty() {
            Vec::new()
        } else {
            body.split('/').collect()
        };
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Literal(lit) => {
                    if lit.as_str() != *part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(params)
    }
}

/// Strip a mount prefix from a path, segment-aligned. A prefix that does not
/// match returns the path unchanged rather than erroring.
pub fn trim_path_prefix<'a>(prefix: &str, path: &'a str) -> &'a str {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Join a mount base and a route path with exactly one separating slash.
pub fn path_join2(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
