//! Checkpoint writer: periodic, size-triggered, or explicit snapshots of
//! committed state, with atomic publish and WAL/checkpoint pruning.
//!
//! A checkpoint file captures every collection's document map and metadata
//! plus the current index definitions at a given end LSN; the
//! `latest_checkpoint` pointer names the newest complete one. The engine
//! facade (`crate::engine`) drives *when* a checkpoint runs (ticker, size,
//! dirty-collection threshold, explicit request); this module only knows
//! *how* to write and load one.

mod coordinator;
mod errors;
mod snapshot;

pub use coordinator::{
    build_checkpoint_file, list_checkpoint_files, load_checkpoint_from, load_latest_checkpoint,
    prune_checkpoint_files, write_checkpoint, write_checkpoint_to,
};
pub use errors::{CheckpointError, CheckpointErrorKind, CheckpointResult};
pub use snapshot::{CheckpointFile, CollectionSnapshot, LatestCheckpointPointer};
