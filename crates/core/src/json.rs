//! JSON helpers: structural diff, shallow merge, page normalization
//!
//! All values are plain `serde_json::Value`s. Objects keep insertion order
//! (`preserve_order`), which is the order the service returned them in.

use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};

/// One fetched batch of an ordered collection, in collection order
pub type Page = Map<String, Value>;

/// Kind name used in diff reports
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Report the first structural divergence between `a` and `b`.
///
/// Returns `None` when the values are structurally equal. Object key order
/// is irrelevant; array order is significant.
///
/// ```
/// use fireman_core::json::diff;
/// use serde_json::json;
///
/// assert_eq!(diff(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})), None);
/// assert_eq!(diff(&json!({"a": 1}), &json!({"a": 2})).unwrap(), "for a: 1 != 2");
/// ```
pub fn diff(a: &Value, b: &Value) -> Option<String> {
    match (a, b) {
        (Value::Null, Value::Null) => None,
        (Value::Array(left), Value::Array(right)) => {
            if left.len() != right.len() {
                return Some(format!("length: {} != {}", left.len(), right.len()));
            }
            left.iter()
                .zip(right)
                .enumerate()
                .find_map(|(i, (x, y))| diff(x, y).map(|d| format!("at {i}: {d}")))
        }
        (Value::Object(left), Value::Object(right)) => {
            let mut left_keys: Vec<&String> = left.keys().collect();
            let mut right_keys: Vec<&String> = right.keys().collect();
            left_keys.sort();
            right_keys.sort();
            if let Some(d) = diff_key_lists(&left_keys, &right_keys) {
                return Some(format!("keys: {d}"));
            }
            left.iter().find_map(|(key, x)| {
                let y = right.get(key).unwrap_or(&Value::Null);
                diff(x, y).map(|d| format!("for {key}: {d}"))
            })
        }
        (Value::Number(x), Value::Number(y)) if numbers_equal(x, y) => None,
        _ if kind_of(a) != kind_of(b) => Some(format!("type: {} != {}", kind_of(a), kind_of(b))),
        _ if a != b => Some(format!("{} != {}", render(a), render(b))),
        _ => None,
    }
}

/// Numeric equality regardless of representation (`1 == 1.0`)
fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn diff_key_lists(left: &[&String], right: &[&String]) -> Option<String> {
    if left.len() != right.len() {
        return Some(format!("length: {} != {}", left.len(), right.len()));
    }
    left.iter()
        .zip(right)
        .enumerate()
        .find(|(_, (x, y))| x != y)
        .map(|(i, (x, y))| format!("at {i}: {x} != {y}"))
}

/// Shallow-merge objects; later keys win.
///
/// Nulls and non-object values are skipped. Returns `None` when no input
/// was an object.
pub fn merge<'a, I>(values: I) -> Option<Map<String, Value>>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut result: Option<Map<String, Value>> = None;
    for value in values {
        if let Value::Object(object) = value {
            let merged = result.get_or_insert_with(Map::new);
            for (key, v) in object {
                merged.insert(key.clone(), v.clone());
            }
        }
    }
    result
}

/// Owned variant of [`merge`], used when combining fan-out results
pub fn merge_owned(values: Vec<Value>) -> Option<Map<String, Value>> {
    let mut result: Option<Map<String, Value>> = None;
    for value in values {
        if let Value::Object(object) = value {
            result.get_or_insert_with(Map::new).extend(object);
        }
    }
    result
}

/// Normalize a fetched collection into a page.
///
/// The service answers with an array when the child keys look like dense
/// indices; those become index-keyed entries with the holes (nulls) dropped.
pub fn to_page(value: Value) -> Result<Page> {
    match value {
        Value::Null => Ok(Page::new()),
        Value::Object(object) => Ok(object),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        other => Err(Error::UnexpectedShape(format!(
            "expected a collection, got {}",
            kind_of(&other)
        ))),
    }
}

/// Child keys of a collection, in collection order
pub fn keys_of(value: Value) -> Result<Vec<String>> {
    Ok(to_page(value)?.into_iter().map(|(k, _)| k).collect())
}

/// Child values of a collection, in collection order
pub fn values_of(value: Value) -> Result<Vec<Value>> {
    Ok(to_page(value)?.into_iter().map(|(_, v)| v).collect())
}
