//! Dotted-key projection of decoded payloads
//!
//! The fluent builder lets callers reduce a response to the fields they
//! care about: a single dotted key path yields the bare values, a list of
//! paths yields restricted maps. Resolution never faults - a missing key,
//! a wrong-typed container, or an out-of-range index simply makes that key
//! absent from the result.
//!
//! # Examples
//!
//! ```
//! use pve_client::projection::{FilterSpec, project};
//! use serde_json::json;
//!
//! let payload = json!([
//!     {"node": "c01", "status": "online"},
//!     {"node": "c02", "status": "offline"},
//! ]);
//! let filter = FilterSpec::key("node");
//! assert_eq!(project(&payload, Some(&filter)), Some(json!(["c01", "c02"])));
//! ```

use serde_json::{Map, Value};

/// Which keys to extract from a decoded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// A single dotted key path; projection yields the bare resolved value
    Key(String),
    /// Several dotted key paths; projection yields maps restricted to the
    /// paths that actually resolved
    Keys(Vec<String>),
}

impl FilterSpec {
    /// Single-path filter
    #[must_use]
    pub fn key(path: impl Into<String>) -> Self {
        Self::Key(path.into())
    }

    /// Multi-path filter
    #[must_use]
    pub fn keys<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(paths.into_iter().map(Into::into).collect())
    }
}

/// Descend through a value along a dotted path.
///
/// Maps are entered by key, lists by numeric index segment. Any step that
/// does not resolve yields `None`.
#[must_use]
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Project a payload through an optional filter.
///
/// With no filter the payload is returned unchanged. A list payload is
/// projected element-wise; a map (or scalar, for a resolvable path) is
/// projected directly. Returns `None` only when a single-path filter
/// resolves nothing at all.
#[must_use]
pub fn project(payload: &Value, filter: Option<&FilterSpec>) -> Option<Value> {
    let Some(filter) = filter else {
        return Some(payload.clone());
    };
    match payload {
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| project_one(item, filter))
                .collect(),
        )),
        other => project_one(other, filter),
    }
}

fn project_one(item: &Value, filter: &FilterSpec) -> Option<Value> {
    match filter {
        FilterSpec::Key(path) => resolve_path(item, path).cloned(),
        FilterSpec::Keys(paths) => {
            let mut out = Map::new();
            for path in paths {
                if let Some(value) = resolve_path(item, path) {
                    out.insert(path.clone(), value.clone());
                }
            }
            Some(Value::Object(out))
        }
    }
}
