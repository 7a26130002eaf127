//! Document type and the reserved `_id` key.

use serde_json::{Map, Value};

/// The reserved key every persisted document must carry.
pub const RESERVED_ID_KEY: &str = "_id";

/// A schemaless document: an unordered string-keyed map of JSON values.
///
/// Documents are value-like. Replacing one overwrites the whole map;
/// partial updates merge only at the top level (see
/// [`crate::store::memory_store::InMemoryStore::partial_update`]).
pub type Document = Map<String, Value>;

/// Returns the `_id` field of a document, if present and a string.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(RESERVED_ID_KEY).and_then(Value::as_str)
}

/// Sets `_id` on a document, overwriting any existing value.
pub fn set_document_id(doc: &mut Document, id: impl Into<String>) {
    doc.insert(RESERVED_ID_KEY.to_string(), Value::String(id.into()));
}
