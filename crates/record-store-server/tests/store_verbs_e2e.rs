// crates/record-store-server/tests/store_verbs_e2e.rs
// ============================================================================
// Module: Store Verb End-to-End Tests
// Description: Full verb flows over both storage backends.
// Purpose: Ensure both backends behave identically behind the service.
// Dependencies: record-store-server, record-store-core, record-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Drives the verb implementations with wire-shaped request bodies against
//! the file backend and the `SQLite` backend, asserting both produce the
//! same observable behavior.

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

use record_store_core::FileRecordStore;
use record_store_core::RecordFields;
use record_store_core::SharedRecordStore;
use record_store_server::StoreRequest;
use record_store_server::StoreService;
use record_store_sqlite::SqliteRecordStore;
use record_store_sqlite::SqliteStoreConfig;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn file_service(dir: &tempfile::TempDir) -> StoreService {
    let store = FileRecordStore::open(dir.path().join("store.json"));
    StoreService::new(SharedRecordStore::from_store(store))
}

fn sqlite_service(dir: &tempfile::TempDir) -> StoreService {
    let store =
        SqliteRecordStore::new(&SqliteStoreConfig::new(dir.path().join("records.db"))).unwrap();
    StoreService::new(SharedRecordStore::from_store(store))
}

fn request(body: serde_json::Value) -> StoreRequest {
    serde_json::from_value(body).unwrap()
}

fn timestamp_seconds(record: &RecordFields, field: &str) -> f64 {
    record.get(field).and_then(serde_json::Value::as_str).unwrap().parse().unwrap()
}

fn name_index(name: &str) -> serde_json::Value {
    json!({
        "fields": ["name"],
        "values": [{ "type": 1, "name": "name", "string": name }],
    })
}

// ============================================================================
// SECTION: Shared Flows
// ============================================================================

/// Insert, list, count, delete, and verify emptiness on one backend.
fn exercise_full_flow(service: &StoreService) {
    let (inserted, _) = service
        .insert(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "data": {
                "structured": [
                    { "type": 1, "name": "name", "string": "a" },
                    { "type": 2, "name": "score", "number": 1 },
                ],
            },
        })))
        .unwrap();
    assert_eq!(inserted.len(), 1);

    let (listed, page) =
        service.list(&request(json!({ "namespace": "ns", "name": "widgets" }))).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].get("name"), Some(&json!("a")));
    assert_eq!(listed[0].get("score"), Some(&json!(1)));
    assert_eq!(page.unwrap().total, 1);

    let (counted, _) = service
        .increase_counter(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "index": name_index("a"),
            "delta": 5,
        })))
        .unwrap();
    assert_eq!(counted.len(), 1);
    assert_eq!(counted[0].get("counter"), Some(&json!(5)));
    assert_eq!(counted[0].get("id"), inserted[0].get("id"));

    service
        .delete(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "index": name_index("a"),
        })))
        .unwrap();
    let (all, _) = service.all(&request(json!({ "namespace": "ns", "name": "widgets" }))).unwrap();
    assert!(all.is_empty());
}

/// Set twice through the same index and verify identity is stable while
/// `update_time` never moves backwards.
fn exercise_set_metadata(service: &StoreService) {
    let (first, _) = service
        .set(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "index": name_index("a"),
            "data": { "serialized": "{\"name\":\"a\",\"score\":1}" },
        })))
        .unwrap();
    let (second, _) = service
        .set(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "index": name_index("a"),
            "data": { "serialized": "{\"name\":\"a\",\"score\":2}" },
        })))
        .unwrap();
    assert_eq!(second[0].get("id"), first[0].get("id"));
    assert_eq!(second[0].get("create_time"), first[0].get("create_time"));
    assert_eq!(second[0].get("score"), Some(&json!(2)));
    assert!(
        timestamp_seconds(&second[0], "update_time")
            >= timestamp_seconds(&first[0], "update_time"),
        "rewrite moved update_time backwards"
    );
    let (all, _) = service.all(&request(json!({ "namespace": "ns", "name": "widgets" }))).unwrap();
    assert_eq!(all.len(), 1);
}

// ============================================================================
// SECTION: Backend Parity
// ============================================================================

#[test]
fn full_flow_on_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    exercise_full_flow(&file_service(&dir));
}

#[test]
fn full_flow_on_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    exercise_full_flow(&sqlite_service(&dir));
}

#[test]
fn set_metadata_on_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    exercise_set_metadata(&file_service(&dir));
}

#[test]
fn set_metadata_on_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    exercise_set_metadata(&sqlite_service(&dir));
}

// ============================================================================
// SECTION: Batched Verbs
// ============================================================================

/// Verifies mset aligns indexes with data positionally.
#[test]
fn mset_aligns_indexes_with_data() {
    let dir = tempfile::tempdir().unwrap();
    let service = file_service(&dir);
    for name in ["a", "b"] {
        service
            .set(&request(json!({
                "namespace": "ns",
                "name": "widgets",
                "index": name_index(name),
                "data": { "serialized": format!("{{\"name\":\"{name}\",\"score\":0}}") },
            })))
            .unwrap();
    }
    let (updated, _) = service
        .mset(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "indexes": [name_index("a"), name_index("b")],
            "data": [
                { "serialized": "{\"name\":\"a\",\"score\":10}" },
                { "serialized": "{\"name\":\"b\",\"score\":20}" },
            ],
        })))
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(updated[0].get("score"), Some(&json!(10)));
    assert_eq!(updated[1].get("score"), Some(&json!(20)));
    let (all, _) = service.all(&request(json!({ "namespace": "ns", "name": "widgets" }))).unwrap();
    assert_eq!(all.len(), 2);
}

/// Verifies mget concatenates the matches of every index.
#[test]
fn mget_concatenates_index_matches() {
    let dir = tempfile::tempdir().unwrap();
    let service = file_service(&dir);
    for name in ["a", "b", "c"] {
        service
            .insert(&request(json!({
                "namespace": "ns",
                "name": "widgets",
                "data": { "serialized": format!("{{\"name\":\"{name}\"}}") },
            })))
            .unwrap();
    }
    let (matches, _) = service
        .mget(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "indexes": [name_index("a"), name_index("c")],
        })))
        .unwrap();
    assert_eq!(matches.len(), 2);
}

/// Verifies get resolves by explicit ids ahead of the index.
#[test]
fn get_prefers_explicit_ids() {
    let dir = tempfile::tempdir().unwrap();
    let service = file_service(&dir);
    let (inserted, _) = service
        .insert(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "batch": [
                { "serialized": "{\"name\":\"a\"}" },
                { "serialized": "{\"name\":\"b\"}" },
            ],
        })))
        .unwrap();
    let id = inserted[0].get("id").and_then(serde_json::Value::as_str).unwrap();
    let (matches, _) = service
        .get(&request(json!({
            "namespace": "ns",
            "name": "widgets",
            "ids": [id],
            "index": name_index("b"),
        })))
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].get("name"), Some(&json!("a")));
}
