//! Record flattening.

use serde_json::{Map, Value};

pub const PATH_SEPARATOR: char = '.';

/// Collapse nested maps into a single level with dot-joined keys.
///
/// Lists and scalars are leaves; empty maps contribute no keys.
pub fn flatten(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(&mut out, None, map);
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: Map<String, Value>) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, PATH_SEPARATOR, key),
            None => key,
        };
        match value {
            Value::Object(inner) => flatten_into(out, Some(&path), inner),
            leaf => {
                out.insert(path, leaf);
            }
        }
    }
}
