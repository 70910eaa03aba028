//! Query evaluation for the local backend
//!
//! Mirrors the service's ordering rules:
//! - by key: keys that are 32-bit integers first, numerically, then the
//!   remaining keys as strings
//! - by value or child: null < false < true < numbers < strings < objects,
//!   ties broken by key

use crate::query::{OrderBy, Query};
use fireman_core::{Error, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Integer value of a key the service orders numerically
pub(crate) fn integer_key(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // No leading zeros, no negative zero
    if (digits.len() > 1 && digits.starts_with('0')) || key == "-0" {
        return None;
    }
    let n: i64 = key.parse().ok()?;
    (i64::from(i32::MIN)..=i64::from(i32::MAX))
        .contains(&n)
        .then_some(n)
}

/// Key ordering
pub(crate) fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) | Value::Object(_) => 5,
    }
}

/// Value ordering; compound values compare equal to each other
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    })
}

/// Value at a slash-separated path below `value`; null when absent
pub(crate) fn descend<'a>(value: &'a Value, path: &str) -> &'a Value {
    crate::path::segments(path)
        .into_iter()
        .try_fold(value, |node, segment| match node {
            Value::Object(children) => children.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .unwrap_or(&Value::Null)
}

fn sort_value<'a>(value: &'a Value, order_by: &OrderBy) -> &'a Value {
    match order_by {
        OrderBy::Key | OrderBy::Value => value,
        OrderBy::Priority => descend(value, ".priority"),
        OrderBy::Child(path) => descend(value, path),
    }
}

enum Bound<'a> {
    Key(String),
    Value(&'a Value),
}

impl<'a> Bound<'a> {
    fn new(order_by: &OrderBy, bound: &'a Value) -> Result<Self> {
        if *order_by != OrderBy::Key {
            return Ok(Bound::Value(bound));
        }
        match bound {
            Value::String(s) => Ok(Bound::Key(s.clone())),
            Value::Number(n) => Ok(Bound::Key(n.to_string())),
            other => Err(Error::InvalidQuery(format!(
                "key bounds must be strings or numbers, got {other}"
            ))),
        }
    }

    /// Where `entry` sits relative to this bound
    fn position(&self, order_by: &OrderBy, key: &str, value: &Value) -> Ordering {
        match self {
            Bound::Key(bound) => compare_keys(key, bound),
            Bound::Value(bound) => compare_values(sort_value(value, order_by), bound),
        }
    }
}

/// Children of a collection node as (key, value) pairs
fn children(node: &Value) -> Vec<(String, &Value)> {
    match node {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Replace compound children with `true`
pub(crate) fn shallow(node: &Value) -> Value {
    match node {
        Value::Object(_) | Value::Array(_) => Value::Object(
            children(node)
                .into_iter()
                .map(|(k, v)| {
                    let v = if v.is_object() || v.is_array() {
                        Value::Bool(true)
                    } else {
                        v.clone()
                    };
                    (k, v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Apply the service's array heuristic: all keys non-negative integers and
/// more than half of `0..=max` present
pub(crate) fn arrayify(map: Map<String, Value>) -> Value {
    let indices: Option<Vec<usize>> = map
        .keys()
        .map(|k| integer_key(k).and_then(|n| usize::try_from(n).ok()))
        .collect();
    match indices.and_then(|indices| indices.into_iter().max()) {
        Some(max) if map.len() * 2 > max + 1 => {
            let mut items = vec![Value::Null; max + 1];
            for (key, value) in map {
                if let Some(i) = integer_key(&key).and_then(|n| usize::try_from(n).ok()) {
                    items[i] = value;
                }
            }
            Value::Array(items)
        }
        _ => Value::Object(map),
    }
}

/// Render a stored node the way the service reports it: nested collections
/// that look like arrays come back as arrays
pub(crate) fn render(node: &Value) -> Value {
    match node {
        Value::Object(map) => arrayify(map.iter().map(|(k, v)| (k.clone(), render(v))).collect()),
        other => other.clone(),
    }
}

/// Evaluate `query` against the node it targets
pub(crate) fn evaluate(node: &Value, query: &Query) -> Result<Value> {
    let Some(order_by) = &query.order_by else {
        return Ok(if query.shallow {
            shallow(node)
        } else {
            render(node)
        });
    };
    if !(node.is_object() || node.is_array()) {
        return Ok(render(node));
    }

    let mut entries = children(node);
    entries.sort_by(|(ka, va), (kb, vb)| match order_by {
        OrderBy::Key => compare_keys(ka, kb),
        _ => compare_values(sort_value(va, order_by), sort_value(vb, order_by))
            .then_with(|| compare_keys(ka, kb)),
    });

    if let Some(bound) = &query.start_at {
        let bound = Bound::new(order_by, bound)?;
        entries.retain(|(k, v)| bound.position(order_by, k, v) != Ordering::Less);
    }
    if let Some(bound) = &query.end_at {
        let bound = Bound::new(order_by, bound)?;
        entries.retain(|(k, v)| bound.position(order_by, k, v) != Ordering::Greater);
    }
    if let Some(bound) = &query.equal_to {
        let bound = Bound::new(order_by, bound)?;
        entries.retain(|(k, v)| bound.position(order_by, k, v) == Ordering::Equal);
    }
    if let Some(limit) = query.limit_to_first {
        entries.truncate(limit);
    }
    if let Some(limit) = query.limit_to_last {
        let excess = entries.len().saturating_sub(limit);
        entries.drain(..excess);
    }

    if entries.is_empty() {
        return Ok(Value::Null);
    }
    let map: Map<String, Value> = entries.into_iter().map(|(k, v)| (k, render(v))).collect();
    Ok(arrayify(map))
}
