//! Field matching logic.
//!
//! # Responsibilities
//! - Match one dotted field path against a regex (search semantics)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Absent field = no match
//! - Patterns are unanchored; use `^`/`$` to pin them

use std::collections::BTreeMap;

use regex::Regex;

/// Dotted field path → string value, derived from a request.
pub type FieldMap = BTreeMap<String, String>;

/// Trait for matching a request's derived fields against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the fields match this condition.
    fn matches(&self, fields: &FieldMap) -> bool;
}

/// Matches a single field against a regex.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    field: String,
    pattern: Regex,
}

impl FieldMatcher {
    /// Compile a matcher for `field`.
    pub fn new(field: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            field: field.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Matcher for FieldMatcher {
    fn matches(&self, fields: &FieldMap) -> bool {
        fields
            .get(&self.field)
            .is_some_and(|value| self.pattern.is_match(value))
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, fields: &FieldMap) -> bool {
        self.matchers.iter().all(|m| m.matches(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_field_matcher_search_semantics() {
        let matcher = FieldMatcher::new("request.headers.user-agent", "probe").unwrap();

        assert!(matcher.matches(&fields(&[("request.headers.user-agent", "kube-probe/1.29")])));
        assert!(!matcher.matches(&fields(&[("request.headers.user-agent", "curl/8.0")])));
    }

    #[test]
    fn test_field_matcher_anchored() {
        let matcher = FieldMatcher::new("request.path", "^/healthz$").unwrap();

        assert!(matcher.matches(&fields(&[("request.path", "/healthz")])));
        assert!(!matcher.matches(&fields(&[("request.path", "/healthz/deep")])));
        assert!(!matcher.matches(&fields(&[("request.path", "/api/healthz")])));
    }

    #[test]
    fn test_field_matcher_absent_field() {
        let matcher = FieldMatcher::new("request.headers.x-probe", ".*").unwrap();
        assert!(!matcher.matches(&fields(&[("request.path", "/")])));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FieldMatcher::new("request.path", "(unclosed").is_err());
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(FieldMatcher::new("request.method", "^GET$").unwrap()),
            Box::new(FieldMatcher::new("request.path", "^/status").unwrap()),
        ]);

        assert!(matcher.matches(&fields(&[
            ("request.method", "GET"),
            ("request.path", "/status/200"),
        ])));
        assert!(!matcher.matches(&fields(&[
            ("request.method", "POST"),
            ("request.path", "/status/200"),
        ])));
        assert!(!matcher.matches(&fields(&[("request.path", "/status/200")])));
    }
}
