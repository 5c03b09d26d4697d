//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the access
//! logger and its demo server. All types derive Serde traits for
//! deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::observability::emitter::Severity;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Demo server settings (bind address, timeouts).
    pub server: ServerConfig,

    /// Diagnostic logging settings.
    pub observability: ObservabilityConfig,

    /// Access log middleware settings.
    pub access_log: AccessLogConfig,
}

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Output format of the diagnostic subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "access_log=debug").
    pub log_level: String,

    /// Pretty for development, JSON for log shippers.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// A single forced-DEBUG rule: dotted field path → regex.
///
/// Every pair must match for the rule to trigger.
pub type DebugRuleConfig = BTreeMap<String, String>;

/// Access log middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Requests matching any of these rules are logged at DEBUG.
    pub debug_requests: Vec<DebugRuleConfig>,

    /// Minimum severity at which bodies are logged. `"none"` disables body logging.
    #[serde(
        deserialize_with = "deserialize_threshold",
        serialize_with = "serialize_threshold"
    )]
    pub body_log_level: Option<Severity>,

    /// Maximum number of body bytes captured per request and per response.
    pub max_body_size: usize,

    /// Flatten the record into dot-joined keys before emitting it.
    pub flatten: bool,

    /// Header names whose values are replaced before the record is emitted.
    pub redact_headers: Vec<String>,
}

pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024;

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            debug_requests: Vec::new(),
            body_log_level: Some(Severity::Warning),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            flatten: true,
            redact_headers: Vec::new(),
        }
    }
}

impl AccessLogConfig {
    /// True when a request resolved at `severity` gets its bodies logged.
    pub fn logs_bodies_at(&self, severity: Severity) -> bool {
        self.body_log_level
            .is_some_and(|threshold| severity >= threshold)
    }
}

fn deserialize_threshold<'de, D>(deserializer: D) -> Result<Option<Severity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().as_str() {
        "none" | "off" => Ok(None),
        other => Severity::parse(other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown log level `{}`", raw))),
    }
}

fn serialize_threshold<S>(value: &Option<Severity>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(severity) => serializer.serialize_str(severity.as_str()),
        None => serializer.serialize_str("none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.access_log.max_body_size, 5120);
        assert_eq!(config.access_log.body_log_level, Some(Severity::Warning));
        assert!(config.access_log.flatten);
        assert!(config.access_log.debug_requests.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_access_log_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [access_log]
            body_log_level = "error"
            max_body_size = 64
            flatten = false

            [[access_log.debug_requests]]
            "request.path" = "^/healthz$"

            [[access_log.debug_requests]]
            "request.method" = "GET"
            "request.headers.user-agent" = "kube-probe"
            "#,
        )
        .unwrap();

        let access_log = config.access_log;
        assert_eq!(access_log.body_log_level, Some(Severity::Error));
        assert_eq!(access_log.max_body_size, 64);
        assert!(!access_log.flatten);
        assert_eq!(access_log.debug_requests.len(), 2);
        assert_eq!(access_log.debug_requests[1].len(), 2);
        assert_eq!(
            access_log.debug_requests[0].get("request.path").map(String::as_str),
            Some("^/healthz$")
        );
    }

    #[test]
    fn test_body_log_level_none_disables_bodies() {
        let config: AccessLogConfig = toml::from_str(r#"body_log_level = "none""#).unwrap();
        assert_eq!(config.body_log_level, None);
        assert!(!config.logs_bodies_at(Severity::Error));
    }

    #[test]
    fn test_body_log_level_rejects_unknown() {
        let result: Result<AccessLogConfig, _> = toml::from_str(r#"body_log_level = "loud""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_logs_bodies_threshold() {
        let config = AccessLogConfig::default();
        assert!(!config.logs_bodies_at(Severity::Debug));
        assert!(!config.logs_bodies_at(Severity::Info));
        assert!(config.logs_bodies_at(Severity::Warning));
        assert!(config.logs_bodies_at(Severity::Error));
    }
}
