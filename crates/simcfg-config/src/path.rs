//! Dot-path lookup into a value tree.
//!
//! Paths are `.`-separated: mapping segments are keys, sequence segments are
//! numeric indices. `general.models.0` names the first element of the
//! `models` sequence under the `general` mapping.

use crate::value::Value;

/// Resolve a dot path against `root`. Returns `None` if any segment does
/// not match (unknown key, out-of-range index, or descending into a scalar).
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Mapping(entries) => entries.get(segment)?,
            Value::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
