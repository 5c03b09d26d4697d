//! Severity selection and access log emission.
//!
//! # Responsibilities
//! - Map a response status (or a forced-DEBUG match) to a severity
//! - Hand the finished record to a sink at that severity
//!
//! # Design Decisions
//! - The record is the structured payload; the message is always "request processed"
//! - `tracing` fields are flat scalars, so the full record goes out as one
//!   JSON-formatted `access_log` field (a string under the JSON formatter).
//!   Method, path, status and duration are repeated as real fields so
//!   subscribers can filter on them without parsing it
//! - Sinks are a trait so tests and embedders can capture records

use std::sync::Mutex;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// `tracing` target used for access log events.
pub const ACCESS_LOG_TARGET: &str = "access_log";

/// Access log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl Severity {
    /// Forced DEBUG wins; otherwise 5xx → ERROR, 4xx → WARNING, else INFO.
    pub fn for_status(status: StatusCode, forced_debug: bool) -> Self {
        if forced_debug {
            Severity::Debug
        } else if status.as_u16() >= 500 {
            Severity::Error
        } else if status.as_u16() >= 400 {
            Severity::Warning
        } else {
            Severity::Info
        }
    }

    /// Case-insensitive parse; accepts `warn` for `warning`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Destination for finished access log records.
pub trait LogSink: Send + Sync {
    fn write(&self, severity: Severity, record: &Record);
}

/// Headline values of a record, flattened or not.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Summary<'a> {
    pub method: Option<&'a str>,
    pub path: Option<&'a str>,
    pub status: Option<u64>,
    pub duration: Option<f64>,
}

impl<'a> Summary<'a> {
    /// Missing keys (an adapter may have deleted them) stay `None`.
    pub fn of(record: &'a Record) -> Self {
        Self {
            method: lookup(record, "request.method").and_then(Value::as_str),
            path: lookup(record, "request.path").and_then(Value::as_str),
            status: lookup(record, "response.status").and_then(Value::as_u64),
            duration: lookup(record, "duration").and_then(Value::as_f64),
        }
    }
}

fn lookup<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).or_else(|| record.get_path(key))
}

macro_rules! access_event {
    ($level:ident, $summary:ident, $record:ident) => {
        tracing::$level!(
            target: ACCESS_LOG_TARGET,
            method = $summary.method,
            path = $summary.path,
            status = $summary.status,
            duration = $summary.duration,
            access_log = %$record,
            "request processed"
        )
    };
}

/// Emits each record as a `tracing` event on the `access_log` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, severity: Severity, record: &Record) {
        let summary = Summary::of(record);
        match severity {
            Severity::Debug => access_event!(debug, summary, record),
            Severity::Info => access_event!(info, summary, record),
            Severity::Warning => access_event!(warn, summary, record),
            Severity::Error => access_event!(error, summary, record),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Severity, Record)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, Record)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<(Severity, Record)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn write(&self, severity: Severity, record: &Record) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((severity, record.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_status() {
        assert_eq!(Severity::for_status(StatusCode::OK, false), Severity::Info);
        assert_eq!(Severity::for_status(StatusCode::MOVED_PERMANENTLY, false), Severity::Info);
        assert_eq!(Severity::for_status(StatusCode::BAD_REQUEST, false), Severity::Warning);
        assert_eq!(Severity::for_status(StatusCode::NOT_FOUND, false), Severity::Warning);
        assert_eq!(Severity::for_status(StatusCode::INTERNAL_SERVER_ERROR, false), Severity::Error);
        assert_eq!(Severity::for_status(StatusCode::GATEWAY_TIMEOUT, false), Severity::Error);
    }

    #[test]
    fn test_forced_debug_always_wins() {
        assert_eq!(Severity::for_status(StatusCode::OK, true), Severity::Debug);
        assert_eq!(Severity::for_status(StatusCode::NOT_FOUND, true), Severity::Debug);
        assert_eq!(Severity::for_status(StatusCode::SERVICE_UNAVAILABLE, true), Severity::Debug);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Severity::parse("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::parse("warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("Error"), Some(Severity::Error));
        assert_eq!(Severity::parse("trace"), None);
    }

    #[test]
    fn test_summary_of_flat_and_nested_records() {
        let mut nested = Record::new();
        nested.set_path("request.method", "GET");
        nested.set_path("request.path", "/orders");
        nested.set_path("response.status", 404);
        nested.insert("duration", 0.5);

        let expected = Summary {
            method: Some("GET"),
            path: Some("/orders"),
            status: Some(404),
            duration: Some(0.5),
        };
        assert_eq!(Summary::of(&nested), expected);

        let flat = nested.clone().flatten();
        assert_eq!(Summary::of(&flat), expected);

        nested.remove_path("request.path");
        assert_eq!(Summary::of(&nested).path, None);
    }

    #[test]
    fn test_tracing_sink_without_subscriber() {
        let mut record = Record::new();
        record.set_path("response.status", 500);
        TracingSink.write(Severity::Error, &record);
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        let mut record = Record::new();
        record.insert("level", "info");
        sink.write(Severity::Info, &record);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.last(), Some((Severity::Info, record)));
    }
}
