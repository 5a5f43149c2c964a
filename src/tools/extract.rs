//! Defensive readers over upstream JSON.
//!
//! Upstream bodies drift: fields go missing, lists collapse to a single
//! object, numbers arrive as strings. Every reader here returns an empty
//! default instead of failing.

use serde_json::Value;

/// String at a JSON pointer, or `""`.
pub fn text(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Non-negative count at a JSON pointer; numeric strings are accepted.
pub fn count(value: &Value, pointer: &str) -> u64 {
    match value.pointer(pointer) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Array at a JSON pointer, or an empty slice.
pub fn array<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Strings of an array at a JSON pointer, skipping non-strings.
pub fn strings(value: &Value, pointer: &str) -> Vec<String> {
    array(value, pointer)
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Treat a value that may be a list, a single object or absent as a list.
pub fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single],
    }
}
