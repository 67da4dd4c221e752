// crates/record-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Record Store
// Description: Durable RecordStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for record store entities.
// Dependencies: record-store-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed [`record_store_core::RecordStore`]
//! implementation. Records are persisted one row per record with the
//! store-managed metadata promoted into columns and the remaining fields kept
//! as a JSON document, so the backend stays schema-less while deletes and
//! lookups run on indexed columns.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteRecordStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
