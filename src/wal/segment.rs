//! WAL segment naming and discovery.
//!
//! Segments are named `wal_<unix-seconds>.log`. The active segment is the
//! one most recently created; segments are discovered by scanning the WAL
//! directory rather than via the `glob` crate, since a single filename
//! pattern match is all `std::fs::read_dir` is needed for.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};

const SEGMENT_PREFIX: &str = "wal_";
const SEGMENT_SUFFIX: &str = ".log";

/// Builds the path for a segment created at the given Unix-second timestamp.
pub fn segment_path(wal_dir: &Path, unix_seconds: u64) -> PathBuf {
    wal_dir.join(format!("{SEGMENT_PREFIX}{unix_seconds}{SEGMENT_SUFFIX}"))
}

/// Extracts the Unix-second timestamp embedded in a segment's filename.
pub fn segment_timestamp(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let stripped = name.strip_prefix(SEGMENT_PREFIX)?.strip_suffix(SEGMENT_SUFFIX)?;
    stripped.parse().ok()
}

/// Lists WAL segments in the directory, LSN/creation order (ascending by the
/// timestamp embedded in the filename). Returns an empty list if the
/// directory does not exist yet.
pub fn list_segments(wal_dir: &Path) -> WalResult<Vec<PathBuf>> {
    if !wal_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(wal_dir)
        .map_err(|e| WalError::io(format!("failed to read WAL directory {}", wal_dir.display()), e))?;

    let mut segments: Vec<(u64, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WalError::io("failed to read WAL directory entry", e))?;
        let path = entry.path();
        if let Some(ts) = segment_timestamp(&path) {
            segments.push((ts, path));
        }
    }

    segments.sort_by_key(|(ts, _)| *ts);
    Ok(segments.into_iter().map(|(_, path)| path).collect())
}
