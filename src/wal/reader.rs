//! Sequential WAL segment reading with torn-tail tolerance.
//!
//! A crash can interrupt an in-flight append, leaving a partial last line in
//! the newest segment. That is not corruption in the usual sense: recovery
//! treats it as a dropped write and continues, rather than failing outright.
//! A bad line anywhere else in a segment is real corruption.

use std::fs;
use std::path::Path;

use super::errors::{WalError, WalResult};
use super::record::WalRecord;

/// The result of reading a segment: the records that parsed cleanly, plus
/// whether the final line was a tolerated torn write.
pub struct ReadOutcome {
    pub records: Vec<WalRecord>,
    pub torn_tail: bool,
}

/// Reads every record from a segment file, verifying each checksum.
///
/// If the last non-empty line fails to parse, it is treated as a torn
/// write (the segment is assumed to be the active, most-recently-written
/// one) and silently dropped; `ReadOutcome::torn_tail` is set so callers can
/// log it. A failure on any earlier line is returned as an error.
pub fn read_segment(path: &Path) -> WalResult<ReadOutcome> {
    let contents = fs::read_to_string(path)
        .map_err(|e| WalError::io(format!("failed to read WAL segment {}", path.display()), e))?;

    let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut records = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        match WalRecord::from_wire_line(line) {
            Ok(record) => records.push(record),
            Err(_) if idx == lines.len() - 1 => {
                return Ok(ReadOutcome { records, torn_tail: true });
            }
            Err(e) => {
                return Err(WalError::corrupt(format!(
                    "corrupt WAL record in {} at line {}: {e}",
                    path.display(),
                    idx + 1
                )));
            }
        }
    }

    Ok(ReadOutcome { records, torn_tail: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::record::WalOp;
    use serde_json::json;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_record(lsn: u64, id: &str) -> String {
        let op = WalOp::Insert {
            collection: "users".into(),
            document_id: id.into(),
            document: json!({"_id": id}),
        };
        let checksum = WalRecord::compute_checksum(lsn, 100, &op);
        let record = WalRecord { lsn, timestamp: 100, op, checksum };
        record.serialize_line()
    }

    #[test]
    fn reads_clean_segment_fully() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal_1.log");
        let mut file = File::create(&path).unwrap();
        file.write_all(write_record(1, "a").as_bytes()).unwrap();
        file.write_all(write_record(2, "b").as_bytes()).unwrap();

        let outcome = read_segment(&path).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert!(!outcome.torn_tail);
    }

    #[test]
    fn tolerates_truncated_final_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal_1.log");
        let mut file = File::create(&path).unwrap();
        file.write_all(write_record(1, "a").as_bytes()).unwrap();
        let second = write_record(2, "b");
        file.write_all(second[..second.len() / 2].as_bytes()).unwrap();

        let outcome = read_segment(&path).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.torn_tail);
    }

    #[test]
    fn rejects_corruption_in_a_non_final_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal_1.log");
        let mut file = File::create(&path).unwrap();
        let corrupted = write_record(1, "a").replace("_id\":\"a\"", "_id\":\"mallory\"");
        file.write_all(corrupted.as_bytes()).unwrap();
        file.write_all(write_record(2, "b").as_bytes()).unwrap();

        let err = read_segment(&path).unwrap_err();
        assert!(format!("{err}").contains("corrupt"));
    }

    #[test]
    fn empty_segment_reads_as_no_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal_1.log");
        File::create(&path).unwrap();
        let outcome = read_segment(&path).unwrap();
        assert!(outcome.records.is_empty());
        assert!(!outcome.torn_tail);
    }
}
