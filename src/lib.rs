//! Structured access logging for axum applications.
//!
//! One record per request/response pair: method, path, headers, status,
//! duration and, above a severity threshold, size-capped bodies. Records pass
//! through an ordered adapter chain, are optionally flattened to dotted keys,
//! and are emitted as `tracing` events on the `access_log` target.
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Router};
//! use access_logger::{access_log_middleware, AccessLogConfig, AccessLogger};
//!
//! # fn build() -> Result<Router, access_logger::rules::RuleError> {
//! let logger = Arc::new(AccessLogger::new(AccessLogConfig::default())?);
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .layer(middleware::from_fn_with_state(logger, access_log_middleware));
//! # Ok(app)
//! # }
//! ```

// Core pipeline
pub mod adapters;
pub mod config;
pub mod record;
pub mod rules;

// Framework integration
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use adapters::{Adapter, AdapterError};
pub use config::{AccessLogConfig, AppConfig};
pub use http::{access_log_middleware, AccessLogger, ExtraLogs, HttpServer};
pub use lifecycle::Shutdown;
pub use observability::{LogSink, MemorySink, Severity};
pub use record::Record;
