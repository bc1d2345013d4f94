//! JSON shapes printed on stdout.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

pub fn ok() -> Value {
    json!({ "ok": true })
}

/// `{"found": false}` for a miss, the record's fields plus `"found": true` for a hit.
pub fn lookup<T: Serialize>(record: Option<T>) -> Result<Value> {
    let Some(record) = record else {
        return Ok(json!({ "found": false }));
    };
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut value {
        fields.insert("found".to_string(), Value::Bool(true));
    }
    Ok(value)
}
