//! Equality filters over document fields.

use crate::model::{values_equal, Document};

/// A filter is a mapping from field name to expected value; every entry
/// must match (logical AND). Values are expected to already be typed
/// (numeric strings parsed to numbers) by the time they reach the store —
/// that coercion happens at the request-decoding boundary.
pub type Filter = Document;

/// Returns true if `document` satisfies every predicate in `filter`.
pub fn matches(document: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| {
        document.get(field).is_some_and(|actual| values_equal(actual, expected))
    })
}
