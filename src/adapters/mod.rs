//! Record adapters.
//!
//! # Data Flow
//! ```text
//! nested Record (+ extra fields)
//!     → adapter 1 → adapter 2 → ... (registration order)
//!     → flattener
//! ```
//!
//! # Design Decisions
//! - Adapters mutate the record in place and may delete anything
//! - A failing or panicking adapter is logged and skipped; the rest still run
//! - The record is emitted regardless of adapter failures

pub mod redact;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::record::{Record, RequestSnapshot};

pub use redact::RedactHeaders;

/// Why an adapter gave up on a record.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl AdapterError {
    pub fn failed(message: impl Into<String>) -> Self {
        AdapterError::Failed(message.into())
    }
}

/// A mutation step applied to every record before it is emitted.
pub trait Adapter: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn adapt(&self, request: &RequestSnapshot, record: &mut Record) -> Result<(), AdapterError>;
}

/// Adapter backed by a closure. Build one with [`from_fn`].
pub struct FnAdapter<F> {
    name: &'static str,
    f: F,
}

/// Wrap a closure as a named adapter.
pub fn from_fn<F>(name: &'static str, f: F) -> FnAdapter<F>
where
    F: Fn(&RequestSnapshot, &mut Record) -> Result<(), AdapterError> + Send + Sync,
{
    FnAdapter { name, f }
}

impl<F> Adapter for FnAdapter<F>
where
    F: Fn(&RequestSnapshot, &mut Record) -> Result<(), AdapterError> + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn adapt(&self, request: &RequestSnapshot, record: &mut Record) -> Result<(), AdapterError> {
        (self.f)(request, record)
    }
}

/// Ordered adapter list.
#[derive(Default)]
pub struct AdapterChain {
    adapters: Vec<Box<dyn Adapter>>,
}

impl AdapterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, adapter: impl Adapter + 'static) {
        self.adapters.push(Box::new(adapter));
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Run every adapter in order. Returns how many failed.
    pub fn apply(&self, request: &RequestSnapshot, record: &mut Record) -> usize {
        let mut failures = 0;
        for adapter in &self.adapters {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| adapter.adapt(request, record)))
                .unwrap_or_else(|payload| Err(AdapterError::Panicked(panic_message(payload.as_ref()))));

            if let Err(e) = outcome {
                failures += 1;
                tracing::warn!(
                    adapter = adapter.name(),
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "Access log adapter failed"
                );
            }
        }
        failures
    }
}

impl std::fmt::Debug for AdapterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.name()))
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
