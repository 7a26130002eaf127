//! A named collection of documents and its lifecycle metadata.

use std::collections::HashMap;

use chrono::Utc;

use crate::model::Document;

/// Lifecycle state of a collection, per spec.md §3/§4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Unloaded,
    Loading,
    Loaded,
    Dirty,
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().expect("current time out of range for a nanosecond timestamp")
}

/// In-memory representation of a collection: its document map plus the
/// bookkeeping the checkpoint and recovery paths need.
pub struct Collection {
    pub name: String,
    pub documents: HashMap<String, Document>,
    pub state: CollectionState,
    pub created_at: i64,
    pub last_modified: i64,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_nanos();
        Self {
            name: name.into(),
            documents: HashMap::new(),
            state: CollectionState::Loaded,
            created_at: now,
            last_modified: now,
        }
    }

    /// Restores a collection from checkpoint or recovery data, skipping the
    /// `Unloaded`/`Loading` transition since the documents are already here.
    pub fn from_snapshot(
        name: impl Into<String>,
        documents: HashMap<String, Document>,
        created_at: i64,
        last_modified: i64,
    ) -> Self {
        Self { name: name.into(), documents, state: CollectionState::Loaded, created_at, last_modified }
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Marks the collection dirty and bumps `last_modified`, called after
    /// every mutation.
    pub fn touch(&mut self) {
        self.last_modified = now_nanos();
        self.state = CollectionState::Dirty;
    }

    pub fn is_dirty(&self) -> bool {
        self.state == CollectionState::Dirty
    }

    /// Transitions `Dirty -> Loaded` after a successful checkpoint capture.
    pub fn mark_clean(&mut self) {
        self.state = CollectionState::Loaded;
    }
}
