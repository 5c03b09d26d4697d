//! Forced-DEBUG rules subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path, query, headers, peer)
//!     → RequestSnapshot::fields() (dotted field map)
//!     → ruleset.rs (OR across rules)
//!     → matcher.rs (AND of field/regex pairs)
//!     → Return: force DEBUG or not
//!
//! Rule Compilation (at startup):
//!     debug_requests config
//!     → Compile regexes
//!     → Freeze as immutable RuleSet
//! ```

pub mod matcher;
pub mod ruleset;

pub use matcher::{FieldMap, Matcher};
pub use ruleset::{RuleError, RuleSet};
