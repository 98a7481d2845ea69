//! Lenient readers for loosely-typed legacy JSON.
//!
//! Legacy settings and values were written by a dynamically typed runtime:
//! booleans show up as `true`, `1`, `"1"` or `""`, ids as numbers or
//! numeric strings. These helpers normalize such values.

use serde_json::{Map, Value as JsonValue};

/// Boolean with "missing or null means `default`" semantics.
pub fn flag(value: Option<&JsonValue>, default: bool) -> bool {
    match value {
        None | Some(JsonValue::Null) => default,
        Some(value) => truthy(value),
    }
}

/// Truthiness of a stored scalar.
pub fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        JsonValue::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

/// Text value; numbers are rendered, null and containers yield `None`.
pub fn text(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(if *b { "1" } else { "" }.to_string()),
        _ => None,
    }
}

/// Text value that must be non-empty to count.
pub fn non_empty_text(value: Option<&JsonValue>) -> Option<String> {
    text(value).filter(|s| !s.is_empty())
}

/// Type marker of a legacy record. Missing, null, empty, `"0"` and `false`
/// all mean "no type".
pub fn type_marker(record: &Map<String, JsonValue>, key: &str) -> Option<String> {
    let marker = record.get(key)?;
    if !truthy(marker) {
        return None;
    }
    text(Some(marker))
}

/// Decode a JSON string, leaving non-JSON strings and other values as they are.
pub fn decode_if_json(value: JsonValue) -> JsonValue {
    if let JsonValue::String(s) = &value {
        let trimmed = s.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(decoded) = serde_json::from_str(s) {
                return decoded;
            }
        }
    }
    value
}

/// A nested object that may be stored inline or as a JSON string.
pub fn nested_object(value: Option<&JsonValue>) -> Map<String, JsonValue> {
    match value {
        Some(JsonValue::Object(map)) => map.clone(),
        Some(JsonValue::String(s)) => match serde_json::from_str(s) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

/// Integer id stored as a number or a numeric string.
pub fn id(value: Option<&JsonValue>) -> Option<i64> {
    match value? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
