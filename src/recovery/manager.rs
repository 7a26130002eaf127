//! Recovery: rebuild engine state at start-up from the latest checkpoint
//! plus the WAL tail, per spec.md §4.6.

use std::path::Path;

use crate::checkpoint::{load_latest_checkpoint, CheckpointFile};
use crate::index::IndexManager;
use crate::model::document_id;
use crate::store::{BatchUpdateRequest, Collection, InMemoryStore};
use crate::wal::{list_segments, read_segment, sorted_by_timestamp, WalOp};

use super::errors::{RecoveryError, RecoveryResult};

/// Summary of a completed recovery pass, for the engine's statistics.
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub loaded_checkpoint: bool,
    pub checkpoint_end_lsn: u64,
    pub records_replayed: u64,
    pub records_skipped_missing_target: u64,
    pub segments_read: usize,
}

/// Loads the latest checkpoint (if any) into `store`/`indexes`, then replays
/// every WAL record with LSN greater than the checkpoint's end LSN.
///
/// A missing checkpoint is a cold start, not an error. A corrupt record in
/// the middle of a segment aborts recovery with `CorruptLogError`; a corrupt
/// record as the final line of the *newest* segment is treated as a torn
/// write and dropped silently.
pub fn recover(
    wal_dir: &Path,
    checkpoint_dir: &Path,
    store: &InMemoryStore,
    indexes: &mut IndexManager,
) -> RecoveryResult<RecoveryReport> {
    let mut report = RecoveryReport::default();

    let checkpoint = load_latest_checkpoint(checkpoint_dir)
        .map_err(|e| RecoveryError::io(format!("failed to load latest checkpoint: {e}")))?;

    let end_lsn = match checkpoint {
        Some(file) => {
            install_checkpoint(store, indexes, &file);
            report.loaded_checkpoint = true;
            report.checkpoint_end_lsn = file.lsn;
            file.lsn
        }
        None => 0,
    };

    let segments = list_segments(wal_dir)
        .map_err(|e| RecoveryError::io(format!("failed to list WAL segments: {e}")))?;
    let segments = sorted_by_timestamp(segments);
    report.segments_read = segments.len();

    for (idx, segment) in segments.iter().enumerate() {
        let is_newest = idx + 1 == segments.len();
        let outcome = read_segment(segment)
            .map_err(|e| RecoveryError::corrupt_log(format!("{}: {e}", segment.display())))?;

        if outcome.torn_tail && !is_newest {
            return Err(RecoveryError::corrupt_log(format!(
                "{}: torn final record tolerated only in the newest WAL segment",
                segment.display()
            )));
        }

        for record in outcome.records {
            if record.lsn <= end_lsn {
                continue;
            }
            let skipped = apply_replayed_op(store, indexes, record.op);
            report.records_replayed += 1;
            report.records_skipped_missing_target += skipped as u64;
        }
    }

    Ok(report)
}

/// Installs every collection and rebuilds every index the checkpoint
/// recorded. Indexes are rebuilt from the documents directly rather than
/// trusted from the checkpoint's flattened id export (see
/// `CheckpointFile::indexes` doc comment).
pub fn install_checkpoint(store: &InMemoryStore, indexes: &mut IndexManager, file: &CheckpointFile) {
    for (name, snapshot) in &file.collections {
        let collection = Collection::from_snapshot(
            name.clone(),
            snapshot.documents.clone(),
            snapshot.created_at,
            snapshot.last_modified,
        );
        store.install_collection(collection);

        for field in &snapshot.indexes {
            let _ = indexes.create_index(name, field);
        }
        indexes.rebuild_collection(name, snapshot.documents.iter().map(|(id, doc)| (id.as_str(), doc)));
    }
}

/// Applies one replayed WAL operation to `store`/`indexes` using the same
/// mutation primitives live operations use. Returns `true` if the record
/// targeted a document that no longer exists and was silently skipped, per
/// spec.md §4.6 step 5.
fn apply_replayed_op(store: &InMemoryStore, indexes: &mut IndexManager, op: WalOp) -> bool {
    match op {
        WalOp::Insert { collection, document_id: id, document } => {
            let doc = document.as_object().cloned().unwrap_or_default();
            let before = store.get(&collection, &id);
            let inserted = store.insert_with_id(&collection, &id, doc);
            match before {
                Some(old) => indexes.reindex_document(&collection, &id, &old, &inserted),
                None => indexes.index_document(&collection, &id, &inserted),
            }
            false
        }
        WalOp::Replace { collection, document_id: id, document } => {
            let doc = document.as_object().cloned().unwrap_or_default();
            match store.get(&collection, &id) {
                Some(old) => match store.replace(&collection, &id, doc) {
                    Ok(new) => {
                        indexes.reindex_document(&collection, &id, &old, &new);
                        false
                    }
                    Err(_) => true,
                },
                None => {
                    let inserted = store.insert_with_id(&collection, &id, doc);
                    indexes.index_document(&collection, &id, &inserted);
                    false
                }
            }
        }
        WalOp::Update { collection, document_id: id, updates } => {
            let updates = updates.as_object().cloned().unwrap_or_default();
            match store.get(&collection, &id) {
                Some(old) => match store.partial_update(&collection, &id, &updates) {
                    Ok(new) => {
                        indexes.reindex_document(&collection, &id, &old, &new);
                        false
                    }
                    Err(_) => true,
                },
                None => true,
            }
        }
        WalOp::Delete { collection, document_id: id } => match store.get(&collection, &id) {
            Some(old) => {
                if store.delete(&collection, &id).is_ok() {
                    indexes.remove_document(&collection, &id, &old);
                }
                false
            }
            None => true,
        },
        WalOp::BatchInsert { collection, documents } => {
            let mut any_skipped = false;
            for document in documents {
                let doc = document.as_object().cloned().unwrap_or_default();
                let Some(id) = document_id(&doc).map(str::to_string) else {
                    any_skipped = true;
                    continue;
                };
                let inserted = store.insert_with_id(&collection, &id, doc);
                indexes.index_document(&collection, &id, &inserted);
            }
            any_skipped
        }
        WalOp::BatchUpdate { collection, ops } => {
            let mut any_skipped = false;
            let requests: Vec<BatchUpdateRequest> = ops
                .iter()
                .map(|op| BatchUpdateRequest {
                    id: op.id.clone(),
                    updates: op.updates.as_object().cloned().unwrap_or_default(),
                })
                .collect();
            for req in requests {
                match store.get(&collection, &req.id) {
                    Some(old) => {
                        if let Ok(new) = store.partial_update(&collection, &req.id, &req.updates) {
                            indexes.reindex_document(&collection, &req.id, &old, &new);
                        }
                    }
                    None => any_skipped = true,
                }
            }
            any_skipped
        }
        WalOp::Checkpoint { .. } | WalOp::Commit { .. } => false,
    }
}
