// crates/record-store-core/src/store.rs
// ============================================================================
// Module: Record Store Contract and File Backend
// Description: Backend-agnostic storage trait plus the single-file backend.
// Purpose: Give every backend one contract with identical upsert semantics.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`RecordStore`] is the storage contract shared by the relational and file
//! backends: load everything in an entity, upsert one record, delete by ids,
//! purge an entity. Metadata stamping goes through
//! [`crate::entity::stamp_record`] so both backends agree on upsert
//! semantics. [`FileRecordStore`] is the local-development backend: the whole
//! store lives in memory and is mirrored to one JSON file after every
//! mutation. It is not safe for multi-process sharing; the last writer wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::entity::EntityKey;
use crate::entity::FIELD_ID;
use crate::entity::RecordFields;
use crate::entity::RecordMeta;
use crate::entity::stamp_record;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Record store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("record store io error: {0}")]
    Io(String),
    /// Backend engine error.
    #[error("record store backend error: {0}")]
    Store(String),
    /// Invalid store data or configuration.
    #[error("record store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Store Contract
// ============================================================================

/// Backend-agnostic record store.
///
/// Absence is not an error anywhere in this contract: loading an unknown
/// entity yields an empty collection and deleting unknown ids is a no-op.
pub trait RecordStore: Send + Sync {
    /// Loads every record stored under the entity key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn load_all(&self, entity: &EntityKey) -> Result<Vec<RecordFields>, StoreError>;

    /// Inserts or rewrites one record.
    ///
    /// When `existing` is given its identity metadata is carried forward;
    /// otherwise a new identity is minted. Returns the full stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn upsert(
        &self,
        entity: &EntityKey,
        fields: RecordFields,
        existing: Option<&RecordMeta>,
    ) -> Result<RecordFields, StoreError>;

    /// Deletes the records with the given ids. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn delete_by_ids(&self, entity: &EntityKey, ids: &[String]) -> Result<(), StoreError>;

    /// Deletes every record under the entity key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the purge fails.
    fn purge(&self, entity: &EntityKey) -> Result<(), StoreError>;
}

/// Shared record store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedRecordStore {
    /// Inner store implementation.
    inner: Arc<dyn RecordStore>,
}

impl SharedRecordStore {
    /// Wraps a record store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl RecordStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl RecordStore for SharedRecordStore {
    fn load_all(&self, entity: &EntityKey) -> Result<Vec<RecordFields>, StoreError> {
        self.inner.load_all(entity)
    }

    fn upsert(
        &self,
        entity: &EntityKey,
        fields: RecordFields,
        existing: Option<&RecordMeta>,
    ) -> Result<RecordFields, StoreError> {
        self.inner.upsert(entity, fields, existing)
    }

    fn delete_by_ids(&self, entity: &EntityKey, ids: &[String]) -> Result<(), StoreError> {
        self.inner.delete_by_ids(entity, ids)
    }

    fn purge(&self, entity: &EntityKey) -> Result<(), StoreError> {
        self.inner.purge(entity)
    }
}

// ============================================================================
// SECTION: File Backend
// ============================================================================

/// Persisted file layout: every entity's records keyed by id.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileStoreState {
    /// Records per entity key, keyed by record id.
    #[serde(default)]
    records: BTreeMap<String, BTreeMap<String, RecordFields>>,
}

/// Single-file record store for local development.
///
/// # Invariants
/// - Every mutation rewrites the whole file; there are no partial writes.
/// - A missing or corrupt file loads as an empty store.
#[derive(Clone)]
pub struct FileRecordStore {
    /// Path of the mirrored JSON file.
    path: PathBuf,
    /// In-memory store state guarded by a mutex.
    state: Arc<Mutex<FileStoreState>>,
}

impl FileRecordStore {
    /// Opens the file-backed store, loading existing contents when present.
    ///
    /// A missing file starts an empty store. A file that cannot be read or
    /// parsed also starts an empty store (accepted data-loss risk of the
    /// local backend) after reporting the problem on stderr.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_state(&path);
        Self {
            path,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Runs a mutation under the lock and mirrors the result to disk.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut FileStoreState) -> T,
    ) -> Result<T, StoreError> {
        let mut guard =
            self.state.lock().map_err(|_| StoreError::Store("store mutex poisoned".to_string()))?;
        let output = apply(&mut guard);
        let serialized = serde_json::to_string_pretty(&*guard)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        // The lock covers the disk write so mirrored files never interleave.
        std::fs::write(&self.path, serialized).map_err(|err| StoreError::Io(err.to_string()))?;
        drop(guard);
        Ok(output)
    }
}

impl RecordStore for FileRecordStore {
    fn load_all(&self, entity: &EntityKey) -> Result<Vec<RecordFields>, StoreError> {
        let guard =
            self.state.lock().map_err(|_| StoreError::Store("store mutex poisoned".to_string()))?;
        Ok(guard
            .records
            .get(entity.as_str())
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert(
        &self,
        entity: &EntityKey,
        fields: RecordFields,
        existing: Option<&RecordMeta>,
    ) -> Result<RecordFields, StoreError> {
        let stamped = stamp_record(fields, existing);
        let id = stamped
            .get(FIELD_ID)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Invalid("stamped record missing id".to_string()))?;
        self.mutate(|state| {
            state
                .records
                .entry(entity.as_str().to_string())
                .or_default()
                .insert(id, stamped.clone());
            stamped
        })
    }

    fn delete_by_ids(&self, entity: &EntityKey, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.mutate(|state| {
            if let Some(map) = state.records.get_mut(entity.as_str()) {
                for id in ids {
                    map.remove(id);
                }
            }
        })
    }

    fn purge(&self, entity: &EntityKey) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.records.insert(entity.as_str().to_string(), BTreeMap::new());
        })
    }
}

/// Loads the persisted state, degrading to empty on absence, unreadable
/// content, or corruption.
fn load_state(path: &Path) -> FileStoreState {
    if !path.exists() {
        return FileStoreState::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn_corrupt_store(path, &err.to_string());
            return FileStoreState::default();
        }
    };
    match serde_json::from_str::<FileStoreState>(&raw) {
        Ok(state) => state,
        Err(err) => {
            warn_corrupt_store(path, &err.to_string());
            FileStoreState::default()
        }
    }
}

/// Reports an unusable store file on stderr before starting empty.
fn warn_corrupt_store(path: &Path, detail: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(
        &mut stderr,
        "record-store: WARNING: ignoring unusable store file {}: {detail}",
        path.display()
    );
}

// ============================================================================
// SECTION: Tests
// ============================================================================
