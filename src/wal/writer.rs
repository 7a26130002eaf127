//! WAL writer: durable, ordered append of records.
//!
//! Per spec.md §5, the writer serializes writes under its own mutex and the
//! LSN counter is incremented under that same lock, so two concurrent
//! writers observe their records land in WAL in the order they acquire it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use super::errors::{WalError, WalResult};
use super::reader::{read_segment, ReadOutcome};
use super::record::{WalOp, WalRecord};
use super::segment::{list_segments, segment_path, segment_timestamp};

/// Durability policy controlling how far a write must propagate before
/// `write` returns, per spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityLevel {
    /// Buffered in process; may be lost on crash.
    None,
    /// Same as `None` at this layer.
    Memory,
    /// Write syscall performed; no explicit sync.
    #[default]
    Os,
    /// Write followed by an explicit file sync before returning.
    Full,
}

struct Inner {
    wal_dir: PathBuf,
    file: BufWriter<File>,
    active_path: PathBuf,
    next_lsn: u64,
    durability: DurabilityLevel,
}

/// Append-only, checksummed WAL writer with segment rotation.
pub struct WalWriter {
    inner: Mutex<Inner>,
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().expect("current time out of range for a nanosecond timestamp")
}

fn now_unix_seconds() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn open_for_append(path: &Path) -> WalResult<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| WalError::io(format!("failed to create WAL directory {}", parent.display()), e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| WalError::io(format!("failed to open WAL segment {}", path.display()), e))
}

impl WalWriter {
    /// Opens the WAL directory, determining the active segment (the most
    /// recent one, or a freshly created one if none exist) and the next LSN
    /// to assign by scanning all existing segments.
    pub fn open(wal_dir: &Path, durability: DurabilityLevel) -> WalResult<Self> {
        fs::create_dir_all(wal_dir)
            .map_err(|e| WalError::io(format!("failed to create WAL directory {}", wal_dir.display()), e))?;

        let segments = list_segments(wal_dir)?;
        let mut max_lsn = 0u64;
        for segment in &segments {
            // A torn final line surfaces as `Ok(ReadOutcome { torn_tail: true, .. })`
            // with the records that did parse; only mid-segment corruption errors.
            let ReadOutcome { records, .. } = read_segment(segment)?;
            if let Some(last) = records.last() {
                max_lsn = max_lsn.max(last.lsn);
            }
        }

        let active_path = match segments.last() {
            Some(path) => path.clone(),
            None => segment_path(wal_dir, now_unix_seconds()),
        };
        let file = BufWriter::new(open_for_append(&active_path)?);

        Ok(Self {
            inner: Mutex::new(Inner {
                wal_dir: wal_dir.to_path_buf(),
                file,
                active_path,
                next_lsn: max_lsn + 1,
                durability,
            }),
        })
    }

    /// Appends a record, assigning it the next LSN. Returns the assigned
    /// record after the configured durability policy has been applied.
    pub fn write(&self, op: WalOp) -> WalResult<WalRecord> {
        let mut inner = self.inner.lock().expect("WAL writer mutex poisoned");

        let lsn = inner.next_lsn;
        let timestamp = now_nanos();
        let checksum = WalRecord::compute_checksum(lsn, timestamp, &op);
        let record = WalRecord { lsn, timestamp, op, checksum };

        let line = record.serialize_line();
        inner
            .file
            .write_all(line.as_bytes())
            .map_err(|e| WalError::io(format!("failed to append WAL record at lsn {lsn}"), e))?;

        match inner.durability {
            DurabilityLevel::None | DurabilityLevel::Memory => {}
            DurabilityLevel::Os => {
                inner
                    .file
                    .flush()
                    .map_err(|e| WalError::io(format!("failed to flush WAL record at lsn {lsn}"), e))?;
            }
            DurabilityLevel::Full => {
                inner
                    .file
                    .flush()
                    .map_err(|e| WalError::io(format!("failed to flush WAL record at lsn {lsn}"), e))?;
                inner
                    .file
                    .get_ref()
                    .sync_all()
                    .map_err(|e| WalError::durability(format!("fsync failed at lsn {lsn}"), e))?;
            }
        }

        inner.next_lsn += 1;
        Ok(record)
    }

    /// Reads all records from a segment, verifying checksums. A torn final
    /// line is dropped silently and not reported as an error here; callers
    /// that need to know whether that happened (recovery) should use
    /// [`read_segment`] directly and inspect `ReadOutcome::torn_tail`.
    pub fn read(&self, segment: &Path) -> WalResult<Vec<WalRecord>> {
        read_segment(segment).map(|outcome| outcome.records)
    }

    /// Closes the active segment and opens a fresh one named by the current
    /// wall-clock second.
    pub fn rotate(&self) -> WalResult<()> {
        let mut inner = self.inner.lock().expect("WAL writer mutex poisoned");
        inner
            .file
            .flush()
            .map_err(|e| WalError::io("failed to flush WAL segment before rotation", e))?;

        let new_path = segment_path(&inner.wal_dir, now_unix_seconds());
        // Guard against rotating twice within the same wall-clock second.
        let new_path = if new_path == inner.active_path {
            segment_path(&inner.wal_dir, now_unix_seconds() + 1)
        } else {
            new_path
        };

        let file = BufWriter::new(open_for_append(&new_path)?);
        inner.file = file;
        inner.active_path = new_path;
        Ok(())
    }

    /// The LSN that will be assigned to the next record written.
    pub fn next_lsn(&self) -> u64 {
        self.inner.lock().expect("WAL writer mutex poisoned").next_lsn
    }

    /// The LSN of the last record written, or 0 if none has been.
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn().saturating_sub(1)
    }

    /// Segments currently present in the WAL directory, oldest first.
    pub fn list_segments(&self) -> WalResult<Vec<PathBuf>> {
        let inner = self.inner.lock().expect("WAL writer mutex poisoned");
        list_segments(&inner.wal_dir)
    }

    /// Deletes every segment whose embedded timestamp sorts at or below the
    /// given segment's, except for the active segment and the most recent
    /// `keep` segments overall (the WAL retention count).
    pub fn prune_segments_at_or_below(&self, max_end_lsn: u64, keep: usize) -> WalResult<()> {
        let inner = self.inner.lock().expect("WAL writer mutex poisoned");
        let segments = list_segments(&inner.wal_dir)?;
        let total = segments.len();

        for (idx, segment) in segments.iter().enumerate() {
            if *segment == inner.active_path {
                continue;
            }
            // Keep at least `keep` of the most recent segments regardless of LSN.
            if total - idx <= keep {
                continue;
            }
            let outcome = match read_segment(segment) {
                Ok(o) => o,
                Err(_) => continue,
            };
            let segment_max_lsn = outcome.records.last().map(|r| r.lsn).unwrap_or(0);
            if segment_max_lsn <= max_end_lsn {
                let _ = fs::remove_file(segment);
            }
        }
        Ok(())
    }

    pub fn wal_dir(&self) -> PathBuf {
        self.inner.lock().expect("WAL writer mutex poisoned").wal_dir.clone()
    }

    pub fn active_segment(&self) -> PathBuf {
        self.inner.lock().expect("WAL writer mutex poisoned").active_path.clone()
    }
}

/// Sorts segment paths by their embedded creation timestamp. Exposed for
/// recovery, which must replay segments in that order.
pub fn sorted_by_timestamp(mut segments: Vec<PathBuf>) -> Vec<PathBuf> {
    segments.sort_by_key(|p| segment_timestamp(p).unwrap_or(0));
    segments
}
