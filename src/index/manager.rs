//! Secondary index subsystem: an inverted `value -> set<id>` mapping kept
//! per `(collection, field)`.
//!
//! `_id` is always looked up directly against the store and is never a row
//! in this table — creating an explicit index on `_id` is rejected, and so
//! is creating a second index on a field that already has one.

use std::collections::{HashMap, HashSet};

use crate::model::Document;

use super::errors::{IndexError, IndexResult};
use super::key::IndexKey;

const RESERVED_ID_FIELD: &str = "_id";

type Postings = HashMap<IndexKey, HashSet<String>>;

/// Tracks every secondary index across every collection.
#[derive(Default)]
pub struct IndexManager {
    indexes: HashMap<(String, String), Postings>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self { indexes: HashMap::new() }
    }

    /// Creates an empty index on `collection.field`.
    pub fn create_index(&mut self, collection: &str, field: &str) -> IndexResult<()> {
        if field == RESERVED_ID_FIELD {
            return Err(IndexError::reserved_field(field));
        }
        let key = (collection.to_string(), field.to_string());
        if self.indexes.contains_key(&key) {
            return Err(IndexError::already_exists(collection, field));
        }
        self.indexes.insert(key, HashMap::new());
        Ok(())
    }

    pub fn drop_index(&mut self, collection: &str, field: &str) -> IndexResult<()> {
        let key = (collection.to_string(), field.to_string());
        if self.indexes.remove(&key).is_none() {
            return Err(IndexError::not_found(collection, field));
        }
        Ok(())
    }

    pub fn has_index(&self, collection: &str, field: &str) -> bool {
        self.indexes.contains_key(&(collection.to_string(), field.to_string()))
    }

    /// Field names indexed on `collection`, sorted for deterministic output.
    pub fn list_indexes(&self, collection: &str) -> Vec<String> {
        let mut fields: Vec<String> = self
            .indexes
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, f)| f.clone())
            .collect();
        fields.sort();
        fields
    }

    /// Adds `document` (with the given id) to every index defined on
    /// `collection` for which the document carries a value.
    pub fn index_document(&mut self, collection: &str, id: &str, document: &Document) {
        for ((c, field), postings) in self.indexes.iter_mut() {
            if c != collection {
                continue;
            }
            if let Some(value) = document.get(field) {
                if let Some(key) = IndexKey::from_json(value) {
                    postings.entry(key).or_default().insert(id.to_string());
                }
            }
        }
    }

    /// Removes `document` (with the given id) from every index on
    /// `collection`.
    pub fn remove_document(&mut self, collection: &str, id: &str, document: &Document) {
        for ((c, field), postings) in self.indexes.iter_mut() {
            if c != collection {
                continue;
            }
            if let Some(value) = document.get(field) {
                if let Some(key) = IndexKey::from_json(value) {
                    if let Some(ids) = postings.get_mut(&key) {
                        ids.remove(id);
                        if ids.is_empty() {
                            postings.remove(&key);
                        }
                    }
                }
            }
        }
    }

    /// Reindexes a document whose fields changed from `old` to `new`.
    pub fn reindex_document(&mut self, collection: &str, id: &str, old: &Document, new: &Document) {
        self.remove_document(collection, id, old);
        self.index_document(collection, id, new);
    }

    /// Drops every index belonging to `collection` (used when a collection
    /// itself is dropped).
    pub fn drop_collection(&mut self, collection: &str) {
        self.indexes.retain(|(c, _), _| c != collection);
    }

    /// Exact-match lookup. Returns ids sorted for deterministic output.
    /// Empty if there is no index on the field or no match.
    pub fn lookup_eq(&self, collection: &str, field: &str, value: &serde_json::Value) -> Vec<String> {
        let Some(postings) = self.indexes.get(&(collection.to_string(), field.to_string())) else {
            return Vec::new();
        };
        let Some(key) = IndexKey::from_json(value) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = postings.get(&key).cloned().unwrap_or_default().into_iter().collect();
        ids.sort();
        ids
    }

    /// Exports every indexed id per (collection, field), flattening the
    /// value dimension — a summary artifact for the checkpoint file, not a
    /// structure recovery can rebuild postings from directly.
    pub fn export_all(&self) -> HashMap<String, HashMap<String, Vec<String>>> {
        let mut out: HashMap<String, HashMap<String, Vec<String>>> = HashMap::new();
        for ((collection, field), postings) in &self.indexes {
            let mut ids: Vec<String> = postings.values().flatten().cloned().collect();
            ids.sort();
            ids.dedup();
            out.entry(collection.clone()).or_default().insert(field.clone(), ids);
        }
        out
    }

    /// Rebuilds every index on `collection` from scratch against the given
    /// full document set, used by recovery after loading a checkpoint and
    /// replaying the WAL tail.
    pub fn rebuild_collection<'a>(
        &mut self,
        collection: &str,
        documents: impl Iterator<Item = (&'a str, &'a Document)>,
    ) {
        let fields = self.list_indexes(collection);
        for field in &fields {
            if let Some(postings) = self.indexes.get_mut(&(collection.to_string(), field.clone())) {
                postings.clear();
            }
        }
        for (id, doc) in documents {
            self.index_document(collection, id, doc);
        }
    }
}
