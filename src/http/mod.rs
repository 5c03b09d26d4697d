//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → middleware/access_log.rs (snapshot, forced-DEBUG, request body prefix)
//!     → extra.rs (ExtraLogs handle in request extensions)
//!     → handler
//!     → middleware/access_log.rs (severity, response body prefix, record, emit)
//!     → Send to client
//! ```
//!
//! `body.rs` holds the bounded capture used on both sides; `server.rs` is the
//! demo server the binary runs.

pub mod body;
pub mod extra;
pub mod middleware;
pub mod server;

pub use extra::ExtraLogs;
pub use middleware::{access_log_middleware, AccessLogger};
pub use server::HttpServer;
