//! Bounded in-process LRU cache of recently touched documents.
//!
//! A cache miss is never an error: every lookup path falls back to the
//! authoritative in-memory store. The cache only shortcuts repeated reads of
//! hot documents and is invalidated eagerly on every write.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::model::Document;

fn cache_key(collection: &str, id: &str) -> String {
    format!("{collection}:{id}")
}

/// A document cache shared across collections, keyed by `"{collection}:{id}"`.
pub struct DocumentCache {
    inner: Mutex<LruCache<String, Document>>,
}

impl DocumentCache {
    /// Creates a cache holding at most `capacity` documents.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1");
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let mut inner = self.inner.lock().expect("document cache mutex poisoned");
        inner.get(&cache_key(collection, id)).cloned()
    }

    pub fn put(&self, collection: &str, id: &str, document: Document) {
        let mut inner = self.inner.lock().expect("document cache mutex poisoned");
        inner.put(cache_key(collection, id), document);
    }

    pub fn invalidate(&self, collection: &str, id: &str) {
        let mut inner = self.inner.lock().expect("document cache mutex poisoned");
        inner.pop(&cache_key(collection, id));
    }

    /// Drops every cached document belonging to `collection` (used when a
    /// collection is dropped or reloaded wholesale).
    pub fn invalidate_collection(&self, collection: &str) {
        let mut inner = self.inner.lock().expect("document cache mutex poisoned");
        let prefix = format!("{collection}:");
        let stale: Vec<String> = inner
            .iter()
            .map(|(k, _)| k.clone())
            .filter(|k| k.starts_with(&prefix))
            .collect();
        for key in stale {
            inner.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("document cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().expect("document cache mutex poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str) -> Document {
        json!({"_id": id, "name": "Alice"}).as_object().unwrap().clone()
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = DocumentCache::new(2);
        cache.put("users", "u1", doc("u1"));
        assert_eq!(cache.get("users", "u1"), Some(doc("u1")));
    }

    #[test]
    fn miss_returns_none() {
        let cache = DocumentCache::new(2);
        assert_eq!(cache.get("users", "missing"), None);
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let cache = DocumentCache::new(1);
        cache.put("users", "u1", doc("u1"));
        cache.put("users", "u2", doc("u2"));
        assert_eq!(cache.get("users", "u1"), None);
        assert_eq!(cache.get("users", "u2"), Some(doc("u2")));
    }

    #[test]
    fn invalidate_removes_single_entry() {
        let cache = DocumentCache::new(4);
        cache.put("users", "u1", doc("u1"));
        cache.put("users", "u2", doc("u2"));
        cache.invalidate("users", "u1");
        assert_eq!(cache.get("users", "u1"), None);
        assert_eq!(cache.get("users", "u2"), Some(doc("u2")));
    }

    #[test]
    fn invalidate_collection_drops_only_that_collections_entries() {
        let cache = DocumentCache::new(4);
        cache.put("users", "u1", doc("u1"));
        cache.put("orders", "o1", doc("o1"));
        cache.invalidate_collection("users");
        assert_eq!(cache.get("users", "u1"), None);
        assert_eq!(cache.get("orders", "o1"), Some(doc("o1")));
    }

    #[test]
    fn different_collections_with_same_id_do_not_collide() {
        let cache = DocumentCache::new(4);
        cache.put("users", "1", doc("1"));
        cache.put("orders", "1", doc("1"));
        assert_eq!(cache.len(), 2);
    }
}
