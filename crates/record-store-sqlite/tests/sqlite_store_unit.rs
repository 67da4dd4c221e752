// crates/record-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Contract and durability coverage for the SQLite backend.
// Purpose: Ensure the SQLite backend honors the shared store contract.
// Dependencies: record-store-sqlite, record-store-core, tempfile
// ============================================================================

//! ## Overview
//! Exercises the `SQLite` backend through the `RecordStore` contract,
//! including reopen durability, schema-version enforcement, and path
//! validation.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use record_store_core::EntityKey;
use record_store_core::RecordFields;
use record_store_core::RecordMeta;
use record_store_core::RecordStore;
use record_store_sqlite::SqliteRecordStore;
use record_store_sqlite::SqliteStoreConfig;
use serde_json::json;

fn fields(value: serde_json::Value) -> RecordFields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => RecordFields::new(),
    }
}

fn open_store(dir: &tempfile::TempDir) -> SqliteRecordStore {
    SqliteRecordStore::new(&SqliteStoreConfig::new(dir.path().join("records.db"))).unwrap()
}

/// Verifies inserted records survive a reopen with metadata intact.
#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let entity = EntityKey::new("ns", "widgets");
    let stored = {
        let store = open_store(&dir);
        store.upsert(&entity, fields(json!({ "name": "a", "score": 7 })), None).unwrap()
    };
    let reopened = open_store(&dir);
    let records = reopened.load_all(&entity).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name"), Some(&json!("a")));
    assert_eq!(records[0].get("score"), Some(&json!(7)));
    assert_eq!(records[0].get("id"), stored.get("id"));
    assert_eq!(records[0].get("create_time"), stored.get("create_time"));
}

/// Verifies rewriting through existing metadata updates the row in place.
#[test]
fn rewrite_updates_row_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let entity = EntityKey::new("ns", "widgets");
    let first = store.upsert(&entity, fields(json!({ "name": "a" })), None).unwrap();
    let meta = RecordMeta::from_fields(&first).unwrap();
    let second = store.upsert(&entity, fields(json!({ "name": "b" })), Some(&meta)).unwrap();
    assert_eq!(second.get("id"), first.get("id"));
    assert_eq!(second.get("create_time"), first.get("create_time"));
    let records = store.load_all(&entity).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name"), Some(&json!("b")));
}

/// Verifies nested payload fields round-trip through the document column.
#[test]
fn nested_fields_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let entity = EntityKey::new("ns", "widgets");
    let payload = json!({ "owner": { "name": "sam" }, "tags": ["a", "b"] });
    store.upsert(&entity, fields(payload.clone()), None).unwrap();
    let records = store.load_all(&entity).unwrap();
    assert_eq!(records[0].get("owner"), payload.get("owner"));
    assert_eq!(records[0].get("tags"), payload.get("tags"));
}

/// Verifies deletes are scoped to the entity and the named ids.
#[test]
fn delete_is_scoped_to_entity_and_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let widgets = EntityKey::new("ns", "widgets");
    let gadgets = EntityKey::new("ns", "gadgets");
    let doomed = store.upsert(&widgets, fields(json!({ "name": "w1" })), None).unwrap();
    store.upsert(&widgets, fields(json!({ "name": "w2" })), None).unwrap();
    store.upsert(&gadgets, fields(json!({ "name": "g" })), None).unwrap();
    let id = doomed.get("id").and_then(serde_json::Value::as_str).unwrap().to_string();
    store.delete_by_ids(&widgets, &[id]).unwrap();
    assert_eq!(store.load_all(&widgets).unwrap().len(), 1);
    assert_eq!(store.load_all(&gadgets).unwrap().len(), 1);
}

/// Verifies purge clears one entity and is idempotent.
#[test]
fn purge_clears_entity_and_repeats_safely() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let entity = EntityKey::new("ns", "widgets");
    store.upsert(&entity, fields(json!({ "name": "a" })), None).unwrap();
    store.purge(&entity).unwrap();
    assert!(store.load_all(&entity).unwrap().is_empty());
    store.purge(&entity).unwrap();
    assert!(store.load_all(&entity).unwrap().is_empty());
}

/// Verifies a directory path is rejected before touching the database.
#[test]
fn directory_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteStoreConfig::new(dir.path());
    assert!(SqliteRecordStore::new(&config).is_err());
}

/// Verifies an unknown schema version fails to open.
#[test]
fn unknown_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    {
        let store = SqliteRecordStore::new(&SqliteStoreConfig::new(&path)).unwrap();
        drop(store);
    }
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    }
    assert!(SqliteRecordStore::new(&SqliteStoreConfig::new(&path)).is_err());
}
