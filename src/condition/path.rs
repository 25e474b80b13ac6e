//! JSON path resolution.
//!
//! Walks a payload one step at a time. A key step only descends into objects, an
//! index step only into arrays and only when in bounds. The first step that
//! cannot be taken ends the walk with `null`.

use serde_json::Value;

use crate::condition::ast::{JsonPath, Step};

static NULL: Value = Value::Null;

/// Resolve `path` against `doc`. Never fails; unreachable values are `null`.
pub fn resolve<'a>(doc: &'a Value, path: &JsonPath) -> &'a Value {
    if path.is_empty() {
        return &NULL;
    }

    let mut current = doc;
    for step in path.steps() {
        let next = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get(key),
            (Step::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => {
                tracing::debug!(path = %path, step = %step, "Path step not applicable, resolving to null");
                return &NULL;
            }
        }
    }
    current
}
