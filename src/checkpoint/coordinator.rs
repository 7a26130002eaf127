//! Checkpoint writer: consistent snapshots, atomic publish, and pruning.
//!
//! Follows the step sequence in spec.md §4.5 (prepare, write temp, fsync,
//! rename, update pointer, prune) over the multi-collection, indexed,
//! end-LSN-stamped checkpoint format it describes.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::index::IndexManager;
use crate::store::InMemoryStore;

use super::errors::{CheckpointError, CheckpointResult};
use super::snapshot::{CheckpointFile, CollectionSnapshot, LatestCheckpointPointer};

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const CHECKPOINT_SUFFIX: &str = ".json";
const LATEST_POINTER_NAME: &str = "latest_checkpoint.json";

fn now_unix_seconds() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn checkpoint_path(dir: &Path, unix_seconds: u64) -> PathBuf {
    dir.join(format!("{CHECKPOINT_PREFIX}{unix_seconds}{CHECKPOINT_SUFFIX}"))
}

fn pointer_path(dir: &Path) -> PathBuf {
    dir.join(LATEST_POINTER_NAME)
}

fn checkpoint_timestamp(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix(CHECKPOINT_PREFIX)?.strip_suffix(CHECKPOINT_SUFFIX)?.parse().ok()
}

/// Step (2)-(7) of spec.md §4.5: snapshots every collection's document map
/// and metadata, captures `end_lsn`, exports index definitions, writes the
/// result to a temp file, fsyncs, renames into place, and updates the
/// `latest_checkpoint` pointer.
///
/// Snapshots every collection currently in the store, not only the ones
/// marked dirty (see DESIGN.md Open Question: checkpoint scope) — this keeps
/// recovery able to fully reconstruct state from the checkpoint plus WAL
/// tail alone, without needing to carry forward unrelated collections from
/// an older checkpoint file.
pub fn write_checkpoint(
    checkpoint_dir: &Path,
    store: &InMemoryStore,
    indexes: &IndexManager,
    end_lsn: u64,
) -> CheckpointResult<PathBuf> {
    fs::create_dir_all(checkpoint_dir)
        .map_err(|e| CheckpointError::io(format!("failed to create checkpoint dir {}", checkpoint_dir.display()), e))?;

    let file = build_checkpoint_file(store, indexes, end_lsn);

    let unix = now_unix_seconds();
    let final_path = checkpoint_path(checkpoint_dir, unix);
    write_checkpoint_to(&final_path, &file)?;
    update_latest_pointer(checkpoint_dir, &final_path)?;

    Ok(final_path)
}

/// Builds an in-memory checkpoint snapshot of every collection currently in
/// `store`, marking each dirty collection clean as it is captured (step (2)
/// of spec.md §4.5). Shared by the periodic/triggered checkpoint path and by
/// `Engine::save_to_file`.
pub fn build_checkpoint_file(store: &InMemoryStore, indexes: &IndexManager, end_lsn: u64) -> CheckpointFile {
    let mut collections = HashMap::new();
    for name in store.list_collections() {
        let Some(handle) = store.get_collection(&name) else { continue };
        let mut coll = handle.write().expect("collection lock poisoned");
        let snapshot = CollectionSnapshot {
            name: coll.name.clone(),
            document_count: coll.document_count(),
            created_at: coll.created_at,
            last_modified: coll.last_modified,
            indexes: indexes.list_indexes(&name),
            documents: coll.documents.clone(),
        };
        coll.mark_clean();
        collections.insert(name, snapshot);
    }

    CheckpointFile { timestamp: now_unix_seconds() as i64, collections, indexes: indexes.export_all(), lsn: end_lsn }
}

/// Atomically writes `file` to `path` (temp file, fsync, rename). Does not
/// touch the `latest_checkpoint` pointer — callers that want the pointer
/// updated go through [`write_checkpoint`].
pub fn write_checkpoint_to(path: &Path, file: &CheckpointFile) -> CheckpointResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CheckpointError::io(format!("failed to create {}", parent.display()), e))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_string_pretty(file)
        .map_err(|e| CheckpointError::serialization("failed to serialize checkpoint", e))?;
    {
        let mut f = File::create(&tmp_path)
            .map_err(|e| CheckpointError::io(format!("failed to create {}", tmp_path.display()), e))?;
        f.write_all(body.as_bytes())
            .map_err(|e| CheckpointError::io(format!("failed to write {}", tmp_path.display()), e))?;
        f.sync_all().map_err(|e| CheckpointError::io(format!("failed to fsync {}", tmp_path.display()), e))?;
    }
    fs::rename(&tmp_path, path)
        .map_err(|e| CheckpointError::io(format!("failed to publish {}", path.display()), e))?;
    Ok(())
}

/// Reads and parses a checkpoint file at an arbitrary path, used by
/// `Engine::load_from_file` (spec.md §6).
pub fn load_checkpoint_from(path: &Path) -> CheckpointResult<CheckpointFile> {
    let body = fs::read_to_string(path)
        .map_err(|e| CheckpointError::io(format!("failed to read {}", path.display()), e))?;
    serde_json::from_str(&body).map_err(|e| CheckpointError::serialization("failed to parse checkpoint file", e))
}

fn update_latest_pointer(checkpoint_dir: &Path, checkpoint_file: &Path) -> CheckpointResult<()> {
    let pointer = LatestCheckpointPointer {
        checkpoint_file: checkpoint_file.file_name().expect("checkpoint path has a filename").to_string_lossy().into_owned(),
    };
    let body = serde_json::to_string_pretty(&pointer)
        .map_err(|e| CheckpointError::serialization("failed to serialize latest_checkpoint pointer", e))?;

    let final_path = pointer_path(checkpoint_dir);
    let tmp_path = checkpoint_dir.join(format!("{LATEST_POINTER_NAME}.tmp"));
    {
        let mut f = File::create(&tmp_path)
            .map_err(|e| CheckpointError::io(format!("failed to create {}", tmp_path.display()), e))?;
        f.write_all(body.as_bytes())
            .map_err(|e| CheckpointError::io(format!("failed to write {}", tmp_path.display()), e))?;
        f.sync_all().map_err(|e| CheckpointError::io(format!("failed to fsync {}", tmp_path.display()), e))?;
    }
    fs::rename(&tmp_path, &final_path)
        .map_err(|e| CheckpointError::io(format!("failed to publish {}", final_path.display()), e))?;
    Ok(())
}

/// Loads the checkpoint the `latest_checkpoint` pointer designates. Returns
/// `Ok(None)` if there is no pointer yet (cold start is not an error, per
/// spec.md §4.6).
pub fn load_latest_checkpoint(checkpoint_dir: &Path) -> CheckpointResult<Option<CheckpointFile>> {
    let pointer_file = pointer_path(checkpoint_dir);
    if !pointer_file.exists() {
        return Ok(None);
    }
    let pointer_body = fs::read_to_string(&pointer_file)
        .map_err(|e| CheckpointError::io(format!("failed to read {}", pointer_file.display()), e))?;
    let pointer: LatestCheckpointPointer = serde_json::from_str(&pointer_body)
        .map_err(|e| CheckpointError::serialization("failed to parse latest_checkpoint pointer", e))?;

    let checkpoint_file_path = checkpoint_dir.join(&pointer.checkpoint_file);
    let body = fs::read_to_string(&checkpoint_file_path)
        .map_err(|e| CheckpointError::io(format!("failed to read {}", checkpoint_file_path.display()), e))?;
    let file: CheckpointFile = serde_json::from_str(&body)
        .map_err(|e| CheckpointError::serialization("failed to parse checkpoint file", e))?;
    Ok(Some(file))
}

/// Checkpoint files present in `dir`, oldest first, excluding the
/// `latest_checkpoint` pointer itself.
pub fn list_checkpoint_files(dir: &Path) -> CheckpointResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir)
        .map_err(|e| CheckpointError::io(format!("failed to read checkpoint dir {}", dir.display()), e))?;
    let mut files: Vec<(u64, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CheckpointError::io("failed to read checkpoint dir entry", e))?;
        let path = entry.path();
        if let Some(ts) = checkpoint_timestamp(&path) {
            files.push((ts, path));
        }
    }
    files.sort_by_key(|(ts, _)| *ts);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Deletes checkpoint files beyond the retention window (step (9) of spec.md
/// §4.5), keeping the most recent `retention` files and never removing the
/// file the `latest_checkpoint` pointer currently designates.
pub fn prune_checkpoint_files(dir: &Path, retention: usize) -> CheckpointResult<()> {
    let files = list_checkpoint_files(dir)?;
    if files.len() <= retention.max(1) {
        return Ok(());
    }
    let latest = load_latest_checkpoint_path(dir)?;
    let cutoff = files.len() - retention.max(1);
    for path in &files[..cutoff] {
        if Some(path.clone()) == latest {
            continue;
        }
        let _ = fs::remove_file(path);
    }
    Ok(())
}

fn load_latest_checkpoint_path(dir: &Path) -> CheckpointResult<Option<PathBuf>> {
    let pointer_file = pointer_path(dir);
    if !pointer_file.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(&pointer_file)
        .map_err(|e| CheckpointError::io(format!("failed to read {}", pointer_file.display()), e))?;
    let pointer: LatestCheckpointPointer = serde_json::from_str(&body)
        .map_err(|e| CheckpointError::serialization("failed to parse latest_checkpoint pointer", e))?;
    Ok(Some(dir.join(pointer.checkpoint_file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn write_then_load_round_trips_documents() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryStore::new();
        store.insert("users", json!({"_id": "u1", "name": "Alice"}).as_object().unwrap().clone());
        let indexes = IndexManager::new();

        write_checkpoint(dir.path(), &store, &indexes, 5).unwrap();

        let loaded = load_latest_checkpoint(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.lsn, 5);
        let users = &loaded.collections["users"];
        assert_eq!(users.document_count, 1);
        assert_eq!(users.documents["u1"]["name"], "Alice");
    }

    #[test]
    fn missing_pointer_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_latest_checkpoint(dir.path()).unwrap().is_none());
    }

    #[test]
    fn checkpoint_marks_dirty_collections_clean() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryStore::new();
        store.insert("users", json!({"_id": "u1"}).as_object().unwrap().clone());
        let handle = store.get_collection("users").unwrap();
        assert!(handle.read().unwrap().is_dirty());

        let indexes = IndexManager::new();
        write_checkpoint(dir.path(), &store, &indexes, 1).unwrap();

        assert!(!handle.read().unwrap().is_dirty());
    }

    #[test]
    fn prune_keeps_retention_window_and_latest() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryStore::new();
        let indexes = IndexManager::new();

        for i in 0..4u64 {
            fs::write(checkpoint_path(dir.path(), 1000 + i), "{}").unwrap();
        }
        write_checkpoint(dir.path(), &store, &indexes, 1).unwrap();

        prune_checkpoint_files(dir.path(), 2).unwrap();
        let remaining = list_checkpoint_files(dir.path()).unwrap();
        assert!(remaining.len() >= 2);
        let latest = load_latest_checkpoint_path(dir.path()).unwrap().unwrap();
        assert!(remaining.contains(&latest));
    }
}
