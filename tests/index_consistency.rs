//! Index consistency (spec.md §8 property 6): after any mutation, the set of
//! ids an index returns for a value equals the set of ids whose current
//! document actually holds that value — exercised through the engine facade
//! across insert, update, replace, delete, and batch paths.

use ledgerdb::config::EngineConfig;
use ledgerdb::engine::{BatchUpdateItem, Engine};
use serde_json::json;
use std::collections::HashSet;
use tempfile::TempDir;

fn doc(value: serde_json::Value) -> ledgerdb::model::Document {
    value.as_object().unwrap().clone()
}

fn engine(dir: &TempDir) -> std::sync::Arc<Engine> {
    Engine::open(EngineConfig {
        wal_dir: dir.path().join("wal"),
        data_dir: dir.path().join("data"),
        checkpoint_dir: dir.path().join("checkpoints"),
        ..EngineConfig::default()
    })
    .unwrap()
}

fn ids_with_city(engine: &Engine, city: &str) -> HashSet<String> {
    let page = engine.find("users", doc(json!({"city": city})), Default::default());
    page.documents.into_iter().map(|d| d["_id"].as_str().unwrap().to_string()).collect()
}

#[test]
fn index_tracks_updates_replaces_and_deletes() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);

    engine.insert("users", doc(json!({"_id": "1", "city": "Boston"}))).unwrap();
    engine.insert("users", doc(json!({"_id": "2", "city": "Boston"}))).unwrap();
    engine.insert("users", doc(json!({"_id": "3", "city": "NYC"}))).unwrap();
    engine.create_index("users", "city").unwrap();

    assert_eq!(ids_with_city(&engine, "boston"), HashSet::from(["1".to_string(), "2".to_string()]));

    // Update moves a document out of the old bucket and into the new one.
    engine.update_by_id("users", "2", doc(json!({"city": "NYC"}))).unwrap();
    assert_eq!(ids_with_city(&engine, "boston"), HashSet::from(["1".to_string()]));
    assert_eq!(ids_with_city(&engine, "nyc"), HashSet::from(["2".to_string(), "3".to_string()]));

    // Replace also reindexes.
    engine.replace_by_id("users", "3", doc(json!({"city": "Boston"}))).unwrap();
    assert_eq!(ids_with_city(&engine, "boston"), HashSet::from(["1".to_string(), "3".to_string()]));
    assert_eq!(ids_with_city(&engine, "nyc"), HashSet::from(["2".to_string()]));

    // Delete removes the id from its bucket entirely.
    engine.delete_by_id("users", "1").unwrap();
    assert_eq!(ids_with_city(&engine, "boston"), HashSet::from(["3".to_string()]));

    // Atomic batch update reindexes every touched document.
    engine
        .batch_update(
            "users",
            vec![
                BatchUpdateItem { id: "2".into(), updates: doc(json!({"city": "Boston"})) },
                BatchUpdateItem { id: "3".into(), updates: doc(json!({"city": "NYC"})) },
            ],
        )
        .unwrap();
    assert_eq!(ids_with_city(&engine, "boston"), HashSet::from(["2".to_string()]));
    assert_eq!(ids_with_city(&engine, "nyc"), HashSet::from(["3".to_string()]));
}

#[test]
fn id_index_is_automatic_and_not_creatable_explicitly() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    engine.insert("users", doc(json!({"_id": "1"}))).unwrap();

    assert!(engine.list_indexes("users").contains(&"_id".to_string()));
    let err = engine.create_index("users", "_id").unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERATION");
}

#[test]
fn creating_a_duplicate_index_is_rejected() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    engine.insert("users", doc(json!({"_id": "1", "age": 1}))).unwrap();
    engine.create_index("users", "age").unwrap();
    let err = engine.create_index("users", "age").unwrap_err();
    assert_eq!(err.code(), "ALREADY_EXISTS");
}
