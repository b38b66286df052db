// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between [`Value`] and JSON text.
//!
//! Follows script `JSON.stringify` rules: `undefined` object properties are
//! dropped, `undefined` array slots become `null`, non-finite numbers become
//! `null`, dates become ISO-8601 strings, and byte views become index-keyed
//! objects.

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Number};

use quiver_core::QueueError;

use crate::value::Value;

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Converts a value into JSON text.
pub fn to_json(value: &Value) -> Result<String, QueueError> {
    let json = to_json_value(value).ok_or_else(|| {
        QueueError::type_error(format!(
            "Value of type {} cannot be converted to JSON",
            value.type_of()
        ))
    })?;
    Ok(serde_json::to_string(&json)?)
}

/// Parses JSON text into a value. Parse errors propagate unwrapped.
pub fn from_json(text: &[u8]) -> Result<Value, QueueError> {
    let json: serde_json::Value = serde_json::from_slice(text)?;
    Ok(from_json_value(json))
}

/// Returns `None` for values `JSON.stringify` omits.
fn to_json_value(value: &Value) -> Option<serde_json::Value> {
    let json = match value {
        Value::Undefined => return None,
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(ms) => date_string(*ms),
        Value::Bytes(bytes) => serde_json::Value::Object(
            bytes
                .iter()
                .enumerate()
                .map(|(i, b)| (i.to_string(), serde_json::Value::from(*b)))
                .collect(),
        ),
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| to_json_value(item).unwrap_or(serde_json::Value::Null))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                if let Some(json) = to_json_value(item) {
                    out.insert(key.clone(), json);
                }
            }
            serde_json::Value::Object(out)
        }
    };
    Some(json)
}

fn number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn date_string(ms: f64) -> serde_json::Value {
    if !ms.is_finite() {
        return serde_json::Value::Null;
    }
    DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .unwrap_or(serde_json::Value::Null)
}

fn from_json_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(from_json_value).collect())
        }
        serde_json::Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, from_json_value(v)))
                .collect(),
        ),
    }
}
