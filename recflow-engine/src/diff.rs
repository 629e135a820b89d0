//! Field-level record diffing.
//!
//! A diff is the set of top-level fields whose value in the edited record
//! differs from the original. It decides whether a save is a no-op and is the
//! body of a PATCH request.

use chrono::DateTime;
use recflow_types::{ID_FIELD, Record};
use serde_json::{Map, Value};

/// Computes the fields of `edited` that differ from `original`.
///
/// Keys listed in `immutable_keys` are never reported. A key present in
/// `original` but missing from `edited` is reported as `null`; a missing key
/// and an explicit `null` are considered equal.
pub fn diff(original: &Record, edited: &Record, immutable_keys: &[&str]) -> Map<String, Value> {
    let before = original.fields();
    let after = edited.fields();
    let mut changed = Map::new();

    let removed = before.keys().filter(|k| !after.contains_key(k.as_str()));
    for key in after.keys().chain(removed) {
        if immutable_keys.contains(&key.as_str()) {
            continue;
        }
        let old = before.get(key).unwrap_or(&Value::Null);
        let new = after.get(key).unwrap_or(&Value::Null);
        if !values_equal(old, new) {
            changed.insert(key.clone(), new.clone());
        }
    }

    changed
}

/// Whether the two records differ in any field, the id included.
pub fn has_difference(original: &Record, edited: &Record) -> bool {
    !diff(original, edited, &[]).is_empty()
}

/// Builds the minimal PATCH body: the changed fields plus the record id.
pub fn patch_payload(id: &str, changes: &Map<String, Value>) -> Map<String, Value> {
    let mut body = changes.clone();
    body.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    body
}

/// Deep structural equality used by [`diff`].
///
/// Numbers compare by value (`1 == 1.0`), strings that both parse as RFC 3339
/// timestamps compare by instant, arrays and objects compare element-wise.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::String(x), Value::String(y)) => x == y || same_instant(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.iter()
                .all(|(k, v)| values_equal(v, y.get(k).unwrap_or(&Value::Null)))
                && y.iter()
                    .filter(|(k, _)| !x.contains_key(k.as_str()))
                    .all(|(_, v)| v.is_null())
        }
        _ => false,
    }
}

fn same_instant(a: &str, b: &str) -> bool {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}
