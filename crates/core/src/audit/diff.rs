//! Before/after diffing of audited records.

use serde::Serialize;
use serde_json::{Map, Value};

use super::types::FieldChange;

/// Fields that change on every write and carry no audit value.
const IGNORED_FIELDS: [&str; 2] = ["updated_at", "created_at"];

/// Top-level field changes between two JSON objects, sorted by field name.
///
/// Non-object values are compared as a single field named `value`.
#[must_use]
pub fn diff_json(before: &Value, after: &Value) -> Vec<FieldChange> {
    let empty = Map::new();
    let (before_map, after_map) = match (before, after) {
        (Value::Object(b), Value::Object(a)) => (b, a),
        (Value::Object(b), Value::Null) => (b, &empty),
        (Value::Null, Value::Object(a)) => (&empty, a),
        _ if before == after => return Vec::new(),
        _ => {
            return vec![FieldChange {
                field: "value".to_string(),
                old_value: Some(before.clone()),
                new_value: Some(after.clone()),
            }];
        }
    };

    let mut fields: Vec<&String> = before_map.keys().chain(after_map.keys()).collect();
    fields.sort();
    fields.dedup();

    fields
        .into_iter()
        .filter(|f| !IGNORED_FIELDS.contains(&f.as_str()))
        .filter_map(|field| {
            let old_value = before_map.get(field).filter(|v| !v.is_null());
            let new_value = after_map.get(field).filter(|v| !v.is_null());
            (old_value != new_value).then(|| FieldChange {
                field: field.clone(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
            })
        })
        .collect()
}

/// Diffs two serializable snapshots of a record.
///
/// A snapshot that fails to serialize is treated as empty.
#[must_use]
pub fn diff_records<T: Serialize>(before: Option<&T>, after: Option<&T>) -> Vec<FieldChange> {
    let to_value = |record: Option<&T>| {
        record
            .and_then(|r| serde_json::to_value(r).ok())
            .unwrap_or(Value::Null)
    };
    diff_json(&to_value(before), &to_value(after))
}
