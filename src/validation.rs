//! Tool argument normalization.
//!
//! Adapters never reject an argument that can be coerced: out-of-range or
//! non-numeric bounds fall back to a documented default, unknown enum values
//! fall back to the default choice. Only a missing required field is an
//! error.

use serde_json::Value;

use crate::types::{Error, Result};

/// Inclusive upper bound for every `max_results` argument.
pub const MAX_RESULTS_CEILING: u32 = 100;

/// Read a required, non-blank argument. Numbers and booleans are accepted
/// and rendered as text.
pub fn required_str(args: &Value, field: &str, message: &str) -> Result<String> {
    optional_str(args, field).ok_or_else(|| Error::validation(message))
}

/// Read an optional argument as trimmed text; blank or null is `None`.
pub fn optional_str(args: &Value, field: &str) -> Option<String> {
    let text = match args.get(field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Clamp a result-count argument into `[1, MAX_RESULTS_CEILING]`.
///
/// Values above the ceiling are clamped to it. Values below 1, non-numeric
/// values and missing values become `default`.
pub fn clamp_max_results(value: Option<&Value>, default: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n < 1 => default,
        Some(n) if n > i64::from(MAX_RESULTS_CEILING) => MAX_RESULTS_CEILING,
        Some(n) => u32::try_from(n).unwrap_or(default),
        None => default,
    }
}

/// Pick `value` (case-insensitively) from `allowed`, else `default`.
pub fn one_of(
    value: Option<&str>,
    allowed: &[&'static str],
    default: &'static str,
) -> &'static str {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .and_then(|v| allowed.iter().copied().find(|a| *a == v))
        .unwrap_or(default)
}
