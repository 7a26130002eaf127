//! Checkpoint file shape, per spec.md §6 "File formats".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Document;

/// One collection's captured state inside a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub name: String,
    pub document_count: usize,
    pub created_at: i64,
    pub last_modified: i64,
    /// Field names with a secondary index on this collection (`_id` is
    /// implicit and not listed).
    pub indexes: Vec<String>,
    pub documents: HashMap<String, Document>,
}

/// The on-disk checkpoint document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub timestamp: i64,
    pub collections: HashMap<String, CollectionSnapshot>,
    /// Informational export of indexed ids per (collection, field); recovery
    /// recomputes the value buckets from `collections[..].documents`, since
    /// this flat list does not retain the value dimension.
    pub indexes: HashMap<String, HashMap<String, Vec<String>>>,
    pub lsn: u64,
}

/// The `latest_checkpoint.json` symbolic pointer contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestCheckpointPointer {
    pub checkpoint_file: String,
}
