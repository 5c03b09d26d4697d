//! Access log records.
//!
//! # Data Flow
//! ```text
//! RequestSnapshot + ResponseSnapshot + captured bodies
//!     → builder.rs (nested Record)
//!     → extra fields merged at the root
//!     → adapters mutate the Record
//!     → flatten.rs (dot-joined keys, optional)
//!     → emitter
//! ```
//!
//! # Design Decisions
//! - A Record is a JSON object tree; adapters may add, replace or delete any node
//! - Dotted paths address nested maps; flattened records use the same strings as plain keys

pub mod builder;
pub mod flatten;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

pub use builder::{BodyCapture, RecordBuilder, RequestSnapshot, ResponseSnapshot};
pub use flatten::{flatten, PATH_SEPARATOR};

/// A single access log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level lookup. For flattened records this accepts full dotted keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Walk nested maps along a dotted path (`"request.headers.host"`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_path_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut current = self.0.get_mut(segments.next()?)?;
        for segment in segments {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Set a value at a dotted path, creating intermediate maps.
    ///
    /// Non-map values found along the way are replaced by maps.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Option<Value> {
        let (parents, leaf) = match path.rsplit_once(PATH_SEPARATOR) {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };

        let mut map = &mut self.0;
        if let Some(parents) = parents {
            for segment in parents.split(PATH_SEPARATOR) {
                let slot = map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                map = match slot {
                    Value::Object(inner) => inner,
                    _ => unreachable!("slot was just made an object"),
                };
            }
        }
        map.insert(leaf.to_string(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Remove the node at a dotted path. Parent maps are kept, even if emptied.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once(PATH_SEPARATOR) {
            Some((parents, leaf)) => self.get_path_mut(parents)?.as_object_mut()?.remove(leaf),
            None => self.0.remove(path),
        }
    }

    /// Merge `extra` at the root, overwriting existing keys.
    pub fn merge(&mut self, extra: Map<String, Value>) {
        self.0.extend(extra);
    }

    /// Collapse nested maps into dot-joined keys.
    pub fn flatten(self) -> Self {
        Self(flatten(self.0))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Compact JSON.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
