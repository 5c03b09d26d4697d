//! Header redaction.

use serde_json::Value;

use crate::adapters::{Adapter, AdapterError};
use crate::record::{Record, RequestSnapshot};

pub const REDACTED: &str = "[redacted]";

/// Replaces the values of sensitive request and response headers.
#[derive(Debug, Clone)]
pub struct RedactHeaders {
    names: Vec<String>,
}

impl RedactHeaders {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

impl Adapter for RedactHeaders {
    fn name(&self) -> &str {
        "redact_headers"
    }

    fn adapt(&self, _request: &RequestSnapshot, record: &mut Record) -> Result<(), AdapterError> {
        for side in ["request.headers", "response.headers"] {
            // Header names may contain dots, so index the map directly.
            let Some(headers) = record.get_path_mut(side).and_then(Value::as_object_mut) else {
                continue;
            };
            for name in &self.names {
                if let Some(value) = headers.get_mut(name) {
                    *value = Value::from(REDACTED);
                }
            }
        }
        Ok(())
    }
}
