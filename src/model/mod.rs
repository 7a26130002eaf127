//! Document data model for ledgerdb
//!
//! A document is an unordered mapping from string keys to JSON-compatible
//! values. `serde_json::Value` is already exactly the tagged variant
//! (`Null | Bool | Number | String | Array | Object`) the storage engine
//! needs, so it is used directly rather than re-declaring an equivalent enum.

mod compare;
mod document;

pub use compare::{coerce_query_value, values_equal};
pub use document::{document_id, set_document_id, Document, RESERVED_ID_KEY};
