//! Compiled forced-DEBUG rules.
//!
//! # Responsibilities
//! - Compile `debug_requests` config into matchers once, at startup
//! - Evaluate a request's fields: OR across rules, AND within a rule
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - Any invalid rule rejects the whole rule set
//! - A rule with no pairs would match every request, so it is rejected here
//!   and not only by config validation

use crate::config::schema::DebugRuleConfig;
use crate::rules::matcher::{AndMatcher, FieldMap, FieldMatcher, Matcher};

/// A debug rule that cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("debug rule #{rule} has no field patterns")]
    Empty { rule: usize },

    #[error("debug rule #{rule} has an empty field path")]
    EmptyField { rule: usize },

    #[error("debug rule #{rule}: invalid pattern for `{field}`: {source}")]
    InvalidPattern {
        rule: usize,
        field: String,
        #[source]
        source: regex::Error,
    },
}

impl RuleError {
    /// Index of the offending rule in `debug_requests`.
    pub fn rule(&self) -> usize {
        match self {
            RuleError::Empty { rule }
            | RuleError::EmptyField { rule }
            | RuleError::InvalidPattern { rule, .. } => *rule,
        }
    }
}

/// The full forced-DEBUG allowlist.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<AndMatcher>,
}

impl RuleSet {
    /// Compile every rule, failing on the first invalid one.
    pub fn compile(rules: &[DebugRuleConfig]) -> Result<Self, RuleError> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| Self::compile_rule(index, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// Compile a single rule into an AND of field matchers.
    pub fn compile_rule(index: usize, rule: &DebugRuleConfig) -> Result<AndMatcher, RuleError> {
        if rule.is_empty() {
            return Err(RuleError::Empty { rule: index });
        }

        let mut matchers: Vec<Box<dyn Matcher>> = Vec::with_capacity(rule.len());
        for (field, pattern) in rule {
            if field.trim().is_empty() {
                return Err(RuleError::EmptyField { rule: index });
            }
            let matcher = FieldMatcher::new(field.as_str(), pattern).map_err(|source| {
                RuleError::InvalidPattern {
                    rule: index,
                    field: field.clone(),
                    source,
                }
            })?;
            matchers.push(Box::new(matcher));
        }
        Ok(AndMatcher::new(matchers))
    }

    /// Returns true if any rule matches the given fields.
    pub fn matches(&self, fields: &FieldMap) -> bool {
        self.rules.iter().any(|rule| rule.matches(fields))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
