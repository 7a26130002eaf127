//! The authoritative in-memory document store: one document map per
//! collection, behind a two-level lock (registry read/write, then a
//! per-collection read/write), per spec.md §5.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::model::{document_id, set_document_id, Document, RESERVED_ID_KEY};

use super::collection::Collection;
use super::errors::{StoreError, StoreResult};
use super::filter::{matches, Filter};
use super::id_gen::IdGenerator;
use super::pagination::{paginate, Page, PaginationOptions};

/// Update to apply as part of an atomic batch, per spec.md §4.2.
pub struct BatchUpdateRequest {
    pub id: String,
    pub updates: Document,
}

pub struct InMemoryStore {
    registry: RwLock<HashMap<String, Arc<RwLock<Collection>>>>,
    id_gen: IdGenerator,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { registry: RwLock::new(HashMap::new()), id_gen: IdGenerator::new() }
    }

    fn ensure_collection(&self, name: &str) -> Arc<RwLock<Collection>> {
        if let Some(existing) = self.registry.read().expect("store registry poisoned").get(name) {
            return existing.clone();
        }
        let mut registry = self.registry.write().expect("store registry poisoned");
        registry
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Collection::new(name))))
            .clone()
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<RwLock<Collection>>> {
        self.registry.read().expect("store registry poisoned").get(name).cloned()
    }

    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.registry.read().expect("store registry poisoned").keys().cloned().collect();
        names.sort();
        names
    }

    pub fn drop_collection(&self, name: &str) {
        self.registry.write().expect("store registry poisoned").remove(name);
    }

    /// Installs a collection wholesale, used by checkpoint load and recovery.
    pub fn install_collection(&self, collection: Collection) {
        let name = collection.name.clone();
        self.registry
            .write()
            .expect("store registry poisoned")
            .insert(name, Arc::new(RwLock::new(collection)));
    }

    pub fn dirty_collection_names(&self) -> Vec<String> {
        self.registry
            .read()
            .expect("store registry poisoned")
            .iter()
            .filter(|(_, c)| c.read().expect("collection lock poisoned").is_dirty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Inserts `document`, creating the collection if this is its first
    /// write and synthesizing `_id` when the payload omits one.
    pub fn insert(&self, collection: &str, mut document: Document) -> Document {
        let id = match document_id(&document) {
            Some(id) => id.to_string(),
            None => self.id_gen.next_id(collection),
        };
        set_document_id(&mut document, id.clone());
        self.insert_with_id(collection, &id, document)
    }

    /// Inserts or overwrites a document under an already-resolved id. Used
    /// by `insert` and by recovery replay (the id is already fixed in the
    /// WAL record, so no new one is generated).
    pub fn insert_with_id(&self, collection: &str, id: &str, mut document: Document) -> Document {
        set_document_id(&mut document, id);
        let handle = self.ensure_collection(collection);
        let mut coll = handle.write().expect("collection lock poisoned");
        coll.documents.insert(id.to_string(), document.clone());
        coll.touch();
        document
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let handle = self.get_collection(collection)?;
        let coll = handle.read().expect("collection lock poisoned");
        coll.documents.get(id).cloned()
    }

    /// Overwrites the document at `id`. `_id` is forced to `id` regardless
    /// of what the payload carries. Fails with `NotFound` if the target
    /// does not already exist.
    pub fn replace(&self, collection: &str, id: &str, mut document: Document) -> StoreResult<Document> {
        let handle = self
            .get_collection(collection)
            .ok_or_else(|| StoreError::not_found(format!("collection `{collection}` not found")))?;
        let mut coll = handle.write().expect("collection lock poisoned");
        if !coll.documents.contains_key(id) {
            return Err(StoreError::not_found(format!("document `{id}` not found in `{collection}`")));
        }
        set_document_id(&mut document, id);
        coll.documents.insert(id.to_string(), document.clone());
        coll.touch();
        Ok(document)
    }

    /// Merges `updates` over the existing document at the top level only;
    /// nested mappings are replaced wholesale, not deep-merged. The `_id`
    /// key in `updates` is ignored.
    pub fn partial_update(&self, collection: &str, id: &str, updates: &Document) -> StoreResult<Document> {
        let handle = self
            .get_collection(collection)
            .ok_or_else(|| StoreError::not_found(format!("collection `{collection}` not found")))?;
        let mut coll = handle.write().expect("collection lock poisoned");
        let existing = coll
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("document `{id}` not found in `{collection}`")))?;

        for (key, value) in updates {
            if key == RESERVED_ID_KEY {
                continue;
            }
            existing.insert(key.clone(), value.clone());
        }
        let merged = existing.clone();
        coll.touch();
        Ok(merged)
    }

    pub fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let handle = self
            .get_collection(collection)
            .ok_or_else(|| StoreError::not_found(format!("collection `{collection}` not found")))?;
        let mut coll = handle.write().expect("collection lock poisoned");
        if coll.documents.remove(id).is_none() {
            return Err(StoreError::not_found(format!("document `{id}` not found in `{collection}`")));
        }
        coll.touch();
        Ok(())
    }

    pub fn batch_insert(&self, collection: &str, documents: Vec<Document>) -> Vec<Document> {
        documents.into_iter().map(|doc| self.insert(collection, doc)).collect()
    }

    /// Atomically applies a batch of partial updates: every target must
    /// exist before any mutation is applied. On the first missing id, no
    /// mutation takes effect and the error names that id.
    pub fn batch_update(
        &self,
        collection: &str,
        ops: Vec<BatchUpdateRequest>,
    ) -> StoreResult<Vec<Document>> {
        let handle = self
            .get_collection(collection)
            .ok_or_else(|| StoreError::not_found(format!("collection `{collection}` not found")))?;
        let mut coll = handle.write().expect("collection lock poisoned");

        for op in &ops {
            if op.id.is_empty() {
                return Err(StoreError::invalid_operation("batch_update id must be non-empty"));
            }
            if !coll.documents.contains_key(&op.id) {
                return Err(StoreError::not_found(op.id.clone()));
            }
        }

        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let existing = coll.documents.get_mut(&op.id).expect("validated above");
            for (key, value) in &op.updates {
                if key == RESERVED_ID_KEY {
                    continue;
                }
                existing.insert(key.clone(), value.clone());
            }
            results.push(existing.clone());
        }
        coll.touch();
        Ok(results)
    }

    /// Every document in `collection` matching `filter`, sorted ascending
    /// by `_id` for deterministic pagination and streaming.
    pub fn scan_matching(&self, collection: &str, filter: &Filter) -> Vec<Document> {
        let Some(handle) = self.get_collection(collection) else {
            return Vec::new();
        };
        let coll = handle.read().expect("collection lock poisoned");
        let mut matched: Vec<Document> =
            coll.documents.values().filter(|doc| matches(doc, filter)).cloned().collect();
        matched.sort_by(|a, b| {
            let a_id = a.get(RESERVED_ID_KEY).and_then(Value::as_str).unwrap_or("");
            let b_id = b.get(RESERVED_ID_KEY).and_then(Value::as_str).unwrap_or("");
            a_id.cmp(b_id)
        });
        matched
    }

    /// Equivalent to `scan_matching` plus pagination, restricted to a
    /// caller-supplied candidate id set (produced by index intersection)
    /// when one is available.
    pub fn find(
        &self,
        collection: &str,
        filter: &Filter,
        pagination: &PaginationOptions,
        candidate_ids: Option<&[String]>,
    ) -> Page {
        let Some(handle) = self.get_collection(collection) else {
            return paginate(Vec::new(), pagination);
        };
        let coll = handle.read().expect("collection lock poisoned");

        let mut matched: Vec<Document> = match candidate_ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| coll.documents.get(id))
                .filter(|doc| matches(doc, filter))
                .cloned()
                .collect(),
            None => coll.documents.values().filter(|doc| matches(doc, filter)).cloned().collect(),
        };
        matched.sort_by(|a, b| {
            let a_id = a.get(RESERVED_ID_KEY).and_then(Value::as_str).unwrap_or("");
            let b_id = b.get(RESERVED_ID_KEY).and_then(Value::as_str).unwrap_or("");
            a_id.cmp(b_id)
        });
        paginate(matched, pagination)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: serde_json::Value) -> Document {
        fields.as_object().unwrap().clone()
    }

    #[test]
    fn insert_assigns_id_when_missing() {
        let store = InMemoryStore::new();
        let inserted = store.insert("users", doc(json!({"name": "Alice"})));
        assert!(inserted.get("_id").and_then(Value::as_str).is_some());
    }

    #[test]
    fn insert_then_get_round_trips() {
        let store = InMemoryStore::new();
        let inserted = store.insert("users", doc(json!({"_id": "u1", "name": "Alice"})));
        let fetched = store.get("users", "u1").unwrap();
        assert_eq!(inserted, fetched);
    }

    #[test]
    fn partial_update_merges_top_level_only() {
        let store = InMemoryStore::new();
        store.insert("users", doc(json!({"_id": "u1", "name": "Alice", "age": 30, "email": "a@x"})));
        let updated = store.partial_update("users", "u1", &doc(json!({"age": 31, "city": "NY"}))).unwrap();
        assert_eq!(updated, doc(json!({"_id": "u1", "name": "Alice", "age": 31, "city": "NY", "email": "a@x"})));
    }

    #[test]
    fn partial_update_ignores_id_in_payload() {
        let store = InMemoryStore::new();
        store.insert("users", doc(json!({"_id": "u1", "name": "Alice"})));
        let updated = store.partial_update("users", "u1", &doc(json!({"_id": "hijacked"}))).unwrap();
        assert_eq!(updated.get("_id").unwrap(), "u1");
    }

    #[test]
    fn replace_overwrites_and_forces_id() {
        let store = InMemoryStore::new();
        store.insert("users", doc(json!({"_id": "u1", "name": "Alice", "age": 30, "city": "NY"})));
        let replaced = store.replace("users", "u1", doc(json!({"name": "Alice S", "age": 32}))).unwrap();
        assert_eq!(replaced, doc(json!({"_id": "u1", "name": "Alice S", "age": 32})));
    }

    #[test]
    fn replace_missing_document_fails() {
        let store = InMemoryStore::new();
        store.insert("users", doc(json!({"_id": "u1"})));
        assert!(store.replace("users", "missing", doc(json!({}))).is_err());
    }

    #[test]
    fn delete_missing_document_fails() {
        let store = InMemoryStore::new();
        assert!(store.delete("users", "missing").is_err());
    }

    #[test]
    fn batch_update_is_atomic_on_missing_id() {
        let store = InMemoryStore::new();
        store.insert("users", doc(json!({"_id": "a", "v": 0})));
        store.insert("users", doc(json!({"_id": "b", "v": 0})));

        let result = store.batch_update(
            "users",
            vec![
                BatchUpdateRequest { id: "a".into(), updates: doc(json!({"v": 1})) },
                BatchUpdateRequest { id: "999".into(), updates: doc(json!({"v": 2})) },
                BatchUpdateRequest { id: "b".into(), updates: doc(json!({"v": 3})) },
            ],
        );

        assert!(result.is_err());
        assert_eq!(store.get("users", "a").unwrap()["v"], 0);
        assert_eq!(store.get("users", "b").unwrap()["v"], 0);
    }

    #[test]
    fn scan_matching_is_sorted_by_id() {
        let store = InMemoryStore::new();
        store.insert("users", doc(json!({"_id": "c"})));
        store.insert("users", doc(json!({"_id": "a"})));
        store.insert("users", doc(json!({"_id": "b"})));

        let ids: Vec<String> = store
            .scan_matching("users", &Filter::new())
            .iter()
            .map(|d| d["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn find_on_missing_collection_returns_empty_page() {
        let store = InMemoryStore::new();
        let page = store.find("ghost", &Filter::new(), &PaginationOptions::default(), None);
        assert_eq!(page.total, 0);
        assert!(page.documents.is_empty());
    }
}
