//! The engine facade: orchestrates WAL write, memory apply, index update,
//! and statistics for every operation in spec.md §6. Holds an `Arc` to each
//! subsystem and routes operation types to handler functions.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam::channel::{self, Receiver};
use serde_json::Value;

use crate::cache::DocumentCache;
use crate::checkpoint::{
    build_checkpoint_file, load_checkpoint_from, prune_checkpoint_files, write_checkpoint,
    write_checkpoint_to,
};
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::index::IndexManager;
use crate::model::{document_id, set_document_id, Document, RESERVED_ID_KEY};
use crate::observability::{Logger, Severity};
use crate::recovery::{self, install_checkpoint};
use crate::store::{BatchUpdateRequest, Filter, IdGenerator, InMemoryStore, Page, PaginationOptions};
use crate::wal::{DurabilityLevel, WalOp, WalWriter};

const STREAM_CHANNEL_CAPACITY: usize = 32;
const STREAM_SEND_TIMEOUT: Duration = Duration::from_secs(5);
const WORKER_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Coarse per-document estimate for `EngineStats::memory_usage_estimate_bytes`;
/// this is a budget signal, not an accounting of actual heap usage.
const ESTIMATED_AVERAGE_DOCUMENT_BYTES: u64 = 512;

fn now_unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// An update targeted at one document within a batch, per spec.md §6.
pub struct BatchUpdateItem {
    pub id: String,
    pub updates: Document,
}

/// Point-in-time statistics, per spec.md §4.7.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub records_written: u64,
    pub bytes_written: u64,
    pub checkpoints_performed: u64,
    pub last_recovery_duration_ms: u64,
    pub last_checkpoint_time: Option<i64>,
    pub memory_usage_estimate_bytes: u64,
    pub collection_count: usize,
}

struct BackgroundWorker {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// The storage engine: WAL writer, in-memory store, index subsystem, and LRU
/// cache, wired into a single operation surface with background checkpoint
/// maintenance.
pub struct Engine {
    config: EngineConfig,
    store: InMemoryStore,
    indexes: Mutex<IndexManager>,
    wal: WalWriter,
    cache: DocumentCache,
    id_gen: IdGenerator,
    checkpoint_mutex: Mutex<()>,
    last_checkpoint_instant: Mutex<Instant>,
    stats: Mutex<EngineStats>,
    worker: Mutex<Option<BackgroundWorker>>,
}

impl Engine {
    /// Opens the engine: recovers state from the latest checkpoint plus WAL
    /// tail (spec.md §4.6), then opens the live WAL writer for new records.
    pub fn open(config: EngineConfig) -> EngineResult<Arc<Self>> {
        let store = InMemoryStore::new();
        let mut indexes = IndexManager::new();

        let recovery_start = Instant::now();
        let report = recovery::recover(&config.wal_dir, &config.checkpoint_dir, &store, &mut indexes)?;
        let recovery_duration = recovery_start.elapsed();

        Logger::info(
            "RECOVERY_COMPLETE",
            &[
                ("loaded_checkpoint", &report.loaded_checkpoint.to_string()),
                ("records_replayed", &report.records_replayed.to_string()),
                ("records_skipped", &report.records_skipped_missing_target.to_string()),
                ("duration_ms", &recovery_duration.as_millis().to_string()),
            ],
        );

        let wal = WalWriter::open(&config.wal_dir, config.durability.into())?;
        let cache = DocumentCache::new(config.cache_capacity);

        let stats = EngineStats {
            last_recovery_duration_ms: recovery_duration.as_millis() as u64,
            collection_count: store.list_collections().len(),
            ..Default::default()
        };

        Ok(Arc::new(Self {
            config,
            store,
            indexes: Mutex::new(indexes),
            wal,
            cache,
            id_gen: IdGenerator::new(),
            checkpoint_mutex: Mutex::new(()),
            last_checkpoint_instant: Mutex::new(Instant::now()),
            stats: Mutex::new(stats),
            worker: Mutex::new(None),
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        let mut snapshot = self.stats.lock().expect("stats mutex poisoned").clone();
        snapshot.collection_count = self.store.list_collections().len();
        let document_total: usize =
            self.store.list_collections().iter().filter_map(|name| self.store.get_collection(name)).map(|c| {
                c.read().expect("collection lock poisoned").document_count()
            }).sum();
        snapshot.memory_usage_estimate_bytes = document_total as u64 * ESTIMATED_AVERAGE_DOCUMENT_BYTES;
        snapshot
    }

    fn record_write(&self, bytes: u64) {
        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.records_written += 1;
        stats.bytes_written += bytes;
    }

    fn write_wal(&self, op: WalOp) -> EngineResult<u64> {
        let record = self.wal.write(op)?;
        let bytes = record.serialize_line().len() as u64;
        self.record_write(bytes);
        Ok(bytes)
    }

    /// Creates the document, creating `collection` if this is its first
    /// write and synthesizing `_id` if the payload omits one.
    pub fn insert(&self, collection: &str, mut document: Document) -> EngineResult<Document> {
        let id = match document_id(&document) {
            Some(id) => id.to_string(),
            None => self.id_gen.next_id(collection),
        };
        set_document_id(&mut document, id.clone());

        self.write_wal(WalOp::Insert {
            collection: collection.to_string(),
            document_id: id.clone(),
            document: Value::Object(document.clone()),
        })?;

        let inserted = self.store.insert_with_id(collection, &id, document);
        self.indexes.lock().expect("index manager mutex poisoned").index_document(collection, &id, &inserted);
        self.cache.put(collection, &id, inserted.clone());
        Ok(inserted)
    }

    /// Validates and assigns ids for a batch (size ≤ `batch_limit`), writes a
    /// single `BatchInsert` WAL record, then applies every document.
    pub fn batch_insert(&self, collection: &str, documents: Vec<Document>) -> EngineResult<Vec<Document>> {
        if documents.len() > self.config.batch_limit {
            return Err(EngineError::invalid_operation(format!(
                "batch_insert exceeds configured limit of {}",
                self.config.batch_limit
            )));
        }

        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = match document_id(&document) {
                Some(id) => id.to_string(),
                None => self.id_gen.next_id(collection),
            };
            set_document_id(&mut document, id);
            prepared.push(document);
        }

        self.write_wal(WalOp::BatchInsert {
            collection: collection.to_string(),
            documents: prepared.iter().map(|d| Value::Object(d.clone())).collect(),
        })?;

        let inserted = self.store.batch_insert(collection, prepared);
        let mut indexes = self.indexes.lock().expect("index manager mutex poisoned");
        for doc in &inserted {
            if let Some(id) = document_id(doc) {
                indexes.index_document(collection, id, doc);
                self.cache.put(collection, id, doc.clone());
            }
        }
        Ok(inserted)
    }

    /// Serves from the cache when possible, falling back to the store.
    pub fn get_by_id(&self, collection: &str, id: &str) -> EngineResult<Document> {
        if let Some(cached) = self.cache.get(collection, id) {
            return Ok(cached);
        }
        let document = self
            .store
            .get(collection, id)
            .ok_or_else(|| EngineError::not_found(format!("document `{id}` not found in `{collection}`")))?;
        self.cache.put(collection, id, document.clone());
        Ok(document)
    }

    /// Top-level merge over the existing document; `_id` in `updates` is
    /// ignored. The target's existence is checked before the WAL record is
    /// written, so a miss never leaves a dead record in the log.
    pub fn update_by_id(&self, collection: &str, id: &str, updates: Document) -> EngineResult<Document> {
        if self.store.get(collection, id).is_none() {
            return Err(EngineError::not_found(format!("document `{id}` not found in `{collection}`")));
        }

        self.write_wal(WalOp::Update {
            collection: collection.to_string(),
            document_id: id.to_string(),
            updates: Value::Object(updates.clone()),
        })?;

        let old = self.store.get(collection, id);
        let new = self.store.partial_update(collection, id, &updates)?;
        if let Some(old) = old {
            self.indexes.lock().expect("index manager mutex poisoned").reindex_document(collection, id, &old, &new);
        }
        self.cache.put(collection, id, new.clone());
        Ok(new)
    }

    /// Full overwrite; `_id` is forced to `id` regardless of the payload.
    pub fn replace_by_id(&self, collection: &str, id: &str, mut document: Document) -> EngineResult<Document> {
        let old = self
            .store
            .get(collection, id)
            .ok_or_else(|| EngineError::not_found(format!("document `{id}` not found in `{collection}`")))?;
        set_document_id(&mut document, id);

        self.write_wal(WalOp::Replace {
            collection: collection.to_string(),
            document_id: id.to_string(),
            document: Value::Object(document.clone()),
        })?;

        let new = self.store.replace(collection, id, document)?;
        self.indexes.lock().expect("index manager mutex poisoned").reindex_document(collection, id, &old, &new);
        self.cache.put(collection, id, new.clone());
        Ok(new)
    }

    pub fn delete_by_id(&self, collection: &str, id: &str) -> EngineResult<()> {
        let old = self
            .store
            .get(collection, id)
            .ok_or_else(|| EngineError::not_found(format!("document `{id}` not found in `{collection}`")))?;

        self.write_wal(WalOp::Delete { collection: collection.to_string(), document_id: id.to_string() })?;

        self.store.delete(collection, id)?;
        self.indexes.lock().expect("index manager mutex poisoned").remove_document(collection, id, &old);
        self.cache.invalidate(collection, id);
        Ok(())
    }

    /// Atomic batch update: every target is confirmed to exist before the
    /// WAL record is written or any mutation is applied.
    pub fn batch_update(&self, collection: &str, items: Vec<BatchUpdateItem>) -> EngineResult<Vec<Document>> {
        if items.len() > self.config.batch_limit {
            return Err(EngineError::invalid_operation(format!(
                "batch_update exceeds configured limit of {}",
                self.config.batch_limit
            )));
        }

        let mut olds = Vec::with_capacity(items.len());
        for item in &items {
            if item.id.is_empty() {
                return Err(EngineError::invalid_operation("batch_update id must be non-empty"));
            }
            let old = self
                .store
                .get(collection, &item.id)
                .ok_or_else(|| EngineError::not_found(item.id.clone()))?;
            olds.push(old);
        }

        self.write_wal(WalOp::BatchUpdate {
            collection: collection.to_string(),
            ops: items
                .iter()
                .map(|item| crate::wal::BatchUpdateOp { id: item.id.clone(), updates: Value::Object(item.updates.clone()) })
                .collect(),
        })?;

        let requests: Vec<BatchUpdateRequest> =
            items.into_iter().map(|item| BatchUpdateRequest { id: item.id, updates: item.updates }).collect();
        let ids: Vec<String> = requests.iter().map(|r| r.id.clone()).collect();
        let updated = self.store.batch_update(collection, requests)?;

        let mut indexes = self.indexes.lock().expect("index manager mutex poisoned");
        for ((id, old), new) in ids.iter().zip(olds.iter()).zip(updated.iter()) {
            indexes.reindex_document(collection, id, old, new);
            self.cache.put(collection, id, new.clone());
        }
        Ok(updated)
    }

    /// Evaluates `filter`'s equality predicates against any matching
    /// secondary indexes before falling back to a full collection scan.
    pub fn find(&self, collection: &str, filter: Filter, pagination: PaginationOptions) -> Page {
        let indexes = self.indexes.lock().expect("index manager mutex poisoned");
        let mut candidates: Option<Vec<String>> = None;
        for (field, value) in &filter {
            if field == RESERVED_ID_KEY || !indexes.has_index(collection, field) {
                continue;
            }
            let hits = indexes.lookup_eq(collection, field, value);
            candidates = Some(match candidates {
                None => hits,
                Some(existing) => {
                    let hit_set: std::collections::HashSet<&String> = hits.iter().collect();
                    existing.into_iter().filter(|id| hit_set.contains(id)).collect()
                }
            });
        }
        drop(indexes);
        self.store.find(collection, &filter, &pagination, candidates.as_deref())
    }

    /// Streams documents matching `filter`. The match set is computed
    /// up front (briefly holding the collection's read lock) and then
    /// handed to the consumer over a bounded channel so a stalled reader
    /// cannot hold the collection lock indefinitely; the producer gives up
    /// on a slow consumer after a five-second send timeout.
    pub fn stream(&self, collection: &str, filter: Filter) -> Receiver<Document> {
        let documents = self.store.scan_matching(collection, &filter);
        let (tx, rx) = channel::bounded(STREAM_CHANNEL_CAPACITY);
        thread::spawn(move || {
            for document in documents {
                if tx.send_timeout(document, STREAM_SEND_TIMEOUT).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// Creates an index on `collection.field`, then backfills it from every
    /// document already present so index consistency holds immediately.
    pub fn create_index(&self, collection: &str, field: &str) -> EngineResult<()> {
        let mut indexes = self.indexes.lock().expect("index manager mutex poisoned");
        indexes.create_index(collection, field)?;
        for document in self.store.scan_matching(collection, &Filter::new()) {
            if let Some(id) = document_id(&document) {
                indexes.index_document(collection, id, &document);
            }
        }
        Ok(())
    }

    /// Field names indexed on `collection`, with the always-present `_id`
    /// index listed first (it is never a row in the index table itself).
    pub fn list_indexes(&self, collection: &str) -> Vec<String> {
        let mut fields = vec![RESERVED_ID_KEY.to_string()];
        fields.extend(self.indexes.lock().expect("index manager mutex poisoned").list_indexes(collection));
        fields
    }

    /// Writes a checkpoint snapshot directly to `path`, outside the normal
    /// `checkpoint_dir`/`latest_checkpoint` pointer rotation.
    pub fn save_to_file(&self, path: &Path) -> EngineResult<()> {
        let _guard = self.checkpoint_mutex.lock().expect("checkpoint mutex poisoned");
        let indexes = self.indexes.lock().expect("index manager mutex poisoned");
        let file = build_checkpoint_file(&self.store, &indexes, self.wal.current_lsn());
        drop(indexes);
        write_checkpoint_to(path, &file)?;

        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.checkpoints_performed += 1;
        stats.last_checkpoint_time = Some(now_unix_seconds());
        Logger::info("CHECKPOINT_SAVED", &[("path", &path.display().to_string())]);
        Ok(())
    }

    /// Replaces live state with the snapshot at `path`: every current
    /// collection and index is dropped, then the checkpoint's collections
    /// and documents are installed (indexes are rebuilt from the documents,
    /// not trusted from the checkpoint's flattened export).
    pub fn load_from_file(&self, path: &Path) -> EngineResult<()> {
        let file = load_checkpoint_from(path)?;
        let mut indexes = self.indexes.lock().expect("index manager mutex poisoned");

        for name in self.store.list_collections() {
            self.store.drop_collection(&name);
            indexes.drop_collection(&name);
            self.cache.invalidate_collection(&name);
        }

        install_checkpoint(&self.store, &mut indexes, &file);
        Logger::info("CHECKPOINT_LOADED", &[("path", &path.display().to_string())]);
        Ok(())
    }

    fn wal_size_bytes(&self) -> u64 {
        std::fs::metadata(self.wal.active_segment()).map(|m| m.len()).unwrap_or(0)
    }

    fn checkpoint_due(&self) -> bool {
        let elapsed = self.last_checkpoint_instant.lock().expect("checkpoint instant mutex poisoned").elapsed();
        if elapsed >= Duration::from_secs(self.config.checkpoint_interval_secs) {
            return true;
        }
        if self.wal_size_bytes() >= self.config.max_wal_size_bytes {
            return true;
        }
        self.store.dirty_collection_names().len() >= self.config.checkpoint_threshold
    }

    /// Runs the checkpoint procedure of spec.md §4.5 steps (1)-(10): write,
    /// prune WAL and checkpoint files beyond retention, rotate the WAL.
    /// Errors are logged and returned rather than propagated to callers of
    /// the background ticker, which retries on the next tick.
    fn run_checkpoint(&self) -> EngineResult<()> {
        let _guard = self.checkpoint_mutex.lock().expect("checkpoint mutex poisoned");
        let indexes = self.indexes.lock().expect("index manager mutex poisoned");
        let end_lsn = self.wal.current_lsn();
        write_checkpoint(&self.config.checkpoint_dir, &self.store, &indexes, end_lsn)?;
        drop(indexes);

        self.wal.prune_segments_at_or_below(end_lsn, self.config.wal_retention_count)?;
        prune_checkpoint_files(&self.config.checkpoint_dir, self.config.checkpoint_retention_count)?;
        self.wal.rotate()?;

        *self.last_checkpoint_instant.lock().expect("checkpoint instant mutex poisoned") = Instant::now();
        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.checkpoints_performed += 1;
        stats.last_checkpoint_time = Some(now_unix_seconds());
        drop(stats);

        Logger::info("CHECKPOINT_COMPLETE", &[("end_lsn", &end_lsn.to_string())]);
        Ok(())
    }

    /// Starts the background checkpoint ticker. Idempotent: a second call
    /// while a worker is already running is a no-op.
    pub fn start_background_workers(self: &Arc<Self>) {
        let mut worker = self.worker.lock().expect("worker mutex poisoned");
        if worker.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let engine = Arc::clone(self);
        let handle = thread::spawn(move || loop {
            match shutdown_rx.recv_timeout(WORKER_POLL_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if engine.checkpoint_due() {
                if let Err(e) = engine.run_checkpoint() {
                    Logger::error("CHECKPOINT_FAILED", &[("error", &e.to_string())]);
                }
            }
        });

        Logger::info("BACKGROUND_WORKERS_STARTED", &[]);
        *worker = Some(BackgroundWorker { shutdown_tx, handle });
    }

    /// Signals the checkpoint worker to stop, joins it, then performs a
    /// final checkpoint (spec.md §4.5/§4.7). Idempotent: a second call when
    /// no worker is running is a no-op.
    pub fn stop_background_workers(&self) {
        let worker = self.worker.lock().expect("worker mutex poisoned").take();
        let Some(worker) = worker else { return };

        let _ = worker.shutdown_tx.send(());
        let _ = worker.handle.join();

        if let Err(e) = self.run_checkpoint() {
            Logger::error("FINAL_CHECKPOINT_FAILED", &[("error", &e.to_string())]);
        }
        Logger::info("BACKGROUND_WORKERS_STOPPED", &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(fields: Value) -> Document {
        fields.as_object().unwrap().clone()
    }

    fn test_config(dir: &TempDir) -> EngineConfig {
        EngineConfig {
            wal_dir: dir.path().join("wal"),
            data_dir: dir.path().join("data"),
            checkpoint_dir: dir.path().join("checkpoints"),
            cache_capacity: 64,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        let inserted = engine.insert("users", doc(json!({"name": "Alice", "age": 30}))).unwrap();
        let id = inserted["_id"].as_str().unwrap().to_string();
        let fetched = engine.get_by_id("users", &id).unwrap();
        assert_eq!(fetched, inserted);
    }

    #[test]
    fn partial_update_merges_and_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        let inserted = engine
            .insert("users", doc(json!({"_id": "u1", "name": "Alice", "age": 30, "email": "a@x"})))
            .unwrap();
        let updated = engine.update_by_id("users", "u1", doc(json!({"age": 31, "city": "NY"}))).unwrap();
        assert_eq!(updated, doc(json!({"_id": "u1", "name": "Alice", "age": 31, "city": "NY", "email": "a@x"})));
        let _ = inserted;
    }

    #[test]
    fn replace_drops_fields_not_in_payload() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.insert("users", doc(json!({"_id": "u1", "name": "Alice", "age": 30, "city": "NY"}))).unwrap();
        let replaced = engine.replace_by_id("users", "u1", doc(json!({"name": "Alice S", "age": 32}))).unwrap();
        assert_eq!(replaced, doc(json!({"_id": "u1", "name": "Alice S", "age": 32})));
    }

    #[test]
    fn batch_update_atomic_failure_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.insert("users", doc(json!({"_id": "a", "v": 0}))).unwrap();
        engine.insert("users", doc(json!({"_id": "b", "v": 0}))).unwrap();

        let err = engine
            .batch_update(
                "users",
                vec![
                    BatchUpdateItem { id: "a".into(), updates: doc(json!({"v": 1})) },
                    BatchUpdateItem { id: "999".into(), updates: doc(json!({"v": 2})) },
                    BatchUpdateItem { id: "b".into(), updates: doc(json!({"v": 3})) },
                ],
            )
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(engine.get_by_id("users", "a").unwrap()["v"], 0);
        assert_eq!(engine.get_by_id("users", "b").unwrap()["v"], 0);
    }

    #[test]
    fn indexed_find_matches_all_predicates() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.insert("users", doc(json!({"_id": "1", "age": 25, "city": "Boston"}))).unwrap();
        engine.insert("users", doc(json!({"_id": "2", "age": 25, "city": "NYC"}))).unwrap();
        engine.insert("users", doc(json!({"_id": "3", "age": 30, "city": "Boston"}))).unwrap();
        engine.create_index("users", "age").unwrap();

        let filter = doc(json!({"age": 25, "city": "boston"}));
        let page = engine.find("users", filter, PaginationOptions::default());
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.documents[0]["_id"], "1");
    }

    #[test]
    fn create_index_backfills_existing_documents() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.insert("users", doc(json!({"_id": "1", "city": "Boston"}))).unwrap();
        engine.create_index("users", "city").unwrap();

        let filter = doc(json!({"city": "boston"}));
        let page = engine.find("users", filter, PaginationOptions::default());
        assert_eq!(page.documents.len(), 1);
    }

    #[test]
    fn list_indexes_always_includes_id() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.insert("users", doc(json!({"_id": "1"}))).unwrap();
        assert!(engine.list_indexes("users").contains(&"_id".to_string()));
        assert!(engine.create_index("users", "_id").is_err());
    }

    #[test]
    fn stream_delivers_all_matching_documents() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        for i in 0..5 {
            engine.insert("users", doc(json!({"_id": i.to_string()}))).unwrap();
        }
        let rx = engine.stream("users", Filter::new());
        let received: Vec<Document> = rx.iter().collect();
        assert_eq!(received.len(), 5);
    }

    #[test]
    fn recovery_survives_restart_across_checkpoint_and_wal_tail() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        {
            let engine = Engine::open(config.clone()).unwrap();
            engine.insert("users", doc(json!({"_id": "a"}))).unwrap();
            engine.insert("users", doc(json!({"_id": "b"}))).unwrap();
            engine.update_by_id("users", "a", doc(json!({"v": 1}))).unwrap();
            engine.delete_by_id("users", "b").unwrap();
            engine.save_to_file(&dir.path().join("manual.json")).unwrap();
            engine.insert("users", doc(json!({"_id": "c"}))).unwrap();
        }

        let engine = Engine::open(config).unwrap();
        assert!(engine.get_by_id("users", "a").is_ok());
        assert!(engine.get_by_id("users", "b").is_err());
        assert!(engine.get_by_id("users", "c").is_ok());
    }

    #[test]
    fn save_and_load_round_trip_to_arbitrary_path() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.insert("users", doc(json!({"_id": "a", "name": "Alice"}))).unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        engine.save_to_file(&snapshot_path).unwrap();

        engine.insert("users", doc(json!({"_id": "b", "name": "Bob"}))).unwrap();
        engine.load_from_file(&snapshot_path).unwrap();

        assert!(engine.get_by_id("users", "a").is_ok());
        assert!(engine.get_by_id("users", "b").is_err());
    }

    #[test]
    fn background_workers_start_stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(test_config(&dir)).unwrap();
        engine.start_background_workers();
        engine.start_background_workers();
        engine.stop_background_workers();
        engine.stop_background_workers();
    }

    #[test]
    fn batch_insert_rejects_oversized_batches() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.batch_limit = 2;
        let engine = Engine::open(config).unwrap();
        let documents = vec![doc(json!({})), doc(json!({})), doc(json!({}))];
        assert!(engine.batch_insert("users", documents).is_err());
    }
}
