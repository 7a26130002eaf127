//! Typed equality for filter and index comparisons.
//!
//! Per spec: string equality is case-insensitive, numeric equality widens
//! integers and floats to a common numeric comparison. No other coercion
//! is performed (a string never equals a number).

use serde_json::Value;

/// Compares two JSON values using the filter/index equality rules.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        (Value::Number(a), Value::Number(b)) => {
            // Widen both sides to f64 so `25` and `25.0` compare equal.
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|bv| values_equal(v, bv)))
        }
        _ => false,
    }
}

/// Parses a query-string style value into the value it should be compared
/// against: numeric strings are parsed to numbers first, everything else
/// falls back to case-insensitive string equality (per spec.md §4.2/§6).
pub fn coerce_query_value(raw: &Value) -> Value {
    if let Value::String(s) = raw {
        if let Ok(i) = s.parse::<i64>() {
            return Value::from(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::from(f);
        }
    }
    raw.clone()
}
