//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every debug rule so bad regexes fail at startup
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::rules::{RuleError, RuleSet};

/// A single semantic problem in the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("debug rule #{0} has no field patterns")]
    EmptyRule(usize),

    #[error("debug rule #{0} has an empty field path")]
    EmptyFieldPath(usize),

    #[error(transparent)]
    InvalidPattern(#[from] RuleError),

    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),

    #[error("server.request_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, rule) in config.access_log.debug_requests.iter().enumerate() {
        match RuleSet::compile_rule(index, rule) {
            Ok(_) => {}
            Err(RuleError::Empty { rule }) => errors.push(ValidationError::EmptyRule(rule)),
            Err(RuleError::EmptyField { rule }) => {
                errors.push(ValidationError::EmptyFieldPath(rule))
            }
            Err(e) => errors.push(e.into()),
        }
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.server.bind_address.clone(),
        ));
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DebugRuleConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".into();
        config.server.request_timeout_secs = 0;
        config.access_log.debug_requests = vec![
            DebugRuleConfig::new(),
            [("request.path".to_string(), "(".to_string())].into_iter().collect(),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::EmptyRule(0)));
        assert!(matches!(errors[1], ValidationError::InvalidPattern(ref e) if e.rule() == 1));
        assert!(matches!(errors[2], ValidationError::InvalidBindAddress(_)));
        assert!(matches!(errors[3], ValidationError::ZeroTimeout));
    }

    #[test]
    fn test_empty_field_path() {
        let mut config = AppConfig::default();
        config.access_log.debug_requests =
            vec![[(" ".to_string(), "x".to_string())].into_iter().collect()];

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::EmptyFieldPath(0)));
    }
}
