//! Engine-level recovery corruption handling (spec.md §4.6/§7): a torn final
//! record in the newest WAL segment is dropped silently; a corrupt record
//! earlier in a segment aborts recovery with `CorruptLogError`.

use ledgerdb::config::EngineConfig;
use ledgerdb::engine::Engine;
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::TempDir;

fn config(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        wal_dir: dir.path().join("wal"),
        data_dir: dir.path().join("data"),
        checkpoint_dir: dir.path().join("checkpoints"),
        ..EngineConfig::default()
    }
}

fn only_wal_segment(dir: &TempDir) -> std::path::PathBuf {
    let wal_dir = dir.path().join("wal");
    let mut entries: Vec<_> = fs::read_dir(&wal_dir).unwrap().map(|e| e.unwrap().path()).collect();
    entries.sort();
    entries.into_iter().next().unwrap()
}

#[test]
fn torn_final_record_is_dropped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir);

    {
        let engine = Engine::open(cfg.clone()).unwrap();
        engine.insert("users", json!({"_id": "1"}).as_object().unwrap().clone()).unwrap();
    }

    let segment = only_wal_segment(&dir);
    let mut file = OpenOptions::new().append(true).open(&segment).unwrap();
    // A partial line with no trailing newline, as a crash mid-append would leave.
    file.write_all(br#"{"type":0,"timestamp":1,"collection":"users","document_id":"2","document":{"#).unwrap();

    let engine = Engine::open(cfg).unwrap();
    assert!(engine.get_by_id("users", "1").is_ok());
    assert!(engine.get_by_id("users", "2").is_err());
}

#[test]
fn corruption_before_the_final_record_aborts_recovery() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir);

    {
        let engine = Engine::open(cfg.clone()).unwrap();
        engine.insert("users", json!({"_id": "1"}).as_object().unwrap().clone()).unwrap();
        engine.insert("users", json!({"_id": "2"}).as_object().unwrap().clone()).unwrap();
    }

    let segment = only_wal_segment(&dir);
    let contents = fs::read_to_string(&segment).unwrap();
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    lines[0] = lines[0].replace("\"document_id\":\"1\"", "\"document_id\":\"tampered\"");
    fs::write(&segment, lines.join("\n") + "\n").unwrap();

    let err = Engine::open(cfg).unwrap_err();
    assert_eq!(err.code(), "CORRUPT_LOG_ERROR");
}
