//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Access log middleware:
//!     → emitter.rs (severity selection, LogSink)
//!     → TracingSink → `access_log` target
//!
//! Diagnostics (adapter failures, server lifecycle):
//!     → tracing macros on the crate's own targets
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//! ```

pub mod emitter;
pub mod logging;

pub use emitter::{LogSink, MemorySink, Severity, TracingSink, ACCESS_LOG_TARGET};
