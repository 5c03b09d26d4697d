//! Per-request extra log fields.
//!
//! The access log middleware puts an [`ExtraLogs`] handle into the request
//! extensions; handlers add fields to it and the middleware merges them at the
//! root of the record before adapters run.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::{Map, Value};

/// Shared handle to the extra fields of one request.
#[derive(Debug, Clone, Default)]
pub struct ExtraLogs {
    fields: Arc<Mutex<Map<String, Value>>>,
}

impl ExtraLogs {
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drain every field collected so far.
    pub fn take(&self) -> Map<String, Value> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        self.fields
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Extracts the handle installed by the middleware. Without the middleware
/// the handle is detached and its fields go nowhere.
impl<S> FromRequestParts<S> for ExtraLogs
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ExtraLogs>()
            .cloned()
            .unwrap_or_default())
    }
}
