//! Normalized index keys.
//!
//! Mirrors the equality rules in [`crate::model::compare`]: strings are
//! lower-cased so lookups are case-insensitive, and numbers are widened to
//! `f64` so `25` and `25.0` land in the same bucket. Arrays and objects are
//! not indexable.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Bool(bool),
    /// Bit pattern of the value widened to `f64`, so integer and float
    /// representations of the same number hash identically.
    Number(u64),
    /// Lower-cased string, for case-insensitive equality.
    String(String),
    Null,
}

impl IndexKey {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|f| IndexKey::Number(f.to_bits())),
            Value::String(s) => Some(IndexKey::String(s.to_lowercase())),
            Value::Null => Some(IndexKey::Null),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}
