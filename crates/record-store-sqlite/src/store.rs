// crates/record-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Record Store
// Description: Durable RecordStore backed by SQLite WAL.
// Purpose: Persist schema-less records with indexed entity partitions.
// Dependencies: record-store-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`RecordStore`] using `SQLite`. Each
//! record is one row keyed by `(entity_key, id)`: the five store-managed
//! metadata fields live in columns and every remaining field is serialized
//! into a JSON document column. Loads parse the document and overlay the
//! metadata columns, so the columns are authoritative when the two disagree.
//! Database contents are untrusted; rows whose document fails to parse load
//! as metadata-only records instead of failing the whole entity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use record_store_core::EntityKey;
use record_store_core::RecordFields;
use record_store_core::RecordMeta;
use record_store_core::RecordStore;
use record_store_core::StoreError;
use record_store_core::entity::FIELD_CREATE_TIME;
use record_store_core::entity::FIELD_DATA_CREATOR;
use record_store_core::entity::FIELD_DATA_UPDATER;
use record_store_core::entity::FIELD_ID;
use record_store_core::entity::FIELD_UPDATE_TIME;
use record_store_core::stamp_record;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` record store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with defaults for the given database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding record payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) | SqliteStoreError::Invalid(message) => {
                Self::Invalid(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed record store with WAL support.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Metadata columns are authoritative over the JSON document.
#[derive(Clone)]
pub struct SqliteRecordStore {
    /// Shared `SQLite` connection.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Opens an `SQLite`-backed record store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_string()))
    }
}

impl RecordStore for SqliteRecordStore {
    fn load_all(&self, entity: &EntityKey) -> Result<Vec<RecordFields>, StoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT id, data_creator, data_updater, create_time, update_time, data_json
                 FROM records WHERE entity_key = ?1 ORDER BY id",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![entity.as_str()], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    data_creator: row.get(1)?,
                    data_updater: row.get(2)?,
                    create_time: row.get(3)?,
                    update_time: row.get(4)?,
                    data_json: row.get(5)?,
                })
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            records.push(row.into_record());
        }
        Ok(records)
    }

    fn upsert(
        &self,
        entity: &EntityKey,
        fields: RecordFields,
        existing: Option<&RecordMeta>,
    ) -> Result<RecordFields, StoreError> {
        let stamped = stamp_record(fields, existing);
        let row = StoredRow::from_record(&stamped)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO records
                     (entity_key, id, data_creator, data_updater, create_time, update_time, \
                 data_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(entity_key, id) DO UPDATE SET
                     data_creator = excluded.data_creator,
                     data_updater = excluded.data_updater,
                     create_time = excluded.create_time,
                     update_time = excluded.update_time,
                     data_json = excluded.data_json",
                params![
                    entity.as_str(),
                    row.id,
                    row.data_creator,
                    row.data_updater,
                    row.create_time,
                    row.update_time,
                    row.data_json,
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(stamped)
    }

    fn delete_by_ids(&self, entity: &EntityKey, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut guard = self.lock()?;
        let tx =
            guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        for id in ids {
            tx.execute(
                "DELETE FROM records WHERE entity_key = ?1 AND id = ?2",
                params![entity.as_str(), id],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn purge(&self, entity: &EntityKey) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute("DELETE FROM records WHERE entity_key = ?1", params![entity.as_str()])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// One persisted record row.
struct StoredRow {
    /// Record identifier.
    id: String,
    /// Writer that created the record.
    data_creator: String,
    /// Writer of the latest rewrite.
    data_updater: String,
    /// Creation timestamp, decimal seconds as a string.
    create_time: String,
    /// Last-update timestamp, decimal seconds as a string.
    update_time: String,
    /// JSON document holding the non-metadata fields.
    data_json: String,
}

impl StoredRow {
    /// Splits a stamped record into metadata columns and a JSON document.
    fn from_record(stamped: &RecordFields) -> Result<Self, SqliteStoreError> {
        let mut payload = stamped.clone();
        for field in
            [FIELD_ID, FIELD_DATA_CREATOR, FIELD_DATA_UPDATER, FIELD_CREATE_TIME, FIELD_UPDATE_TIME]
        {
            payload.remove(field);
        }
        let data_json = serde_json::to_string(&payload)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        Ok(Self {
            id: metadata_column(stamped, FIELD_ID)?,
            data_creator: metadata_column(stamped, FIELD_DATA_CREATOR)?,
            data_updater: metadata_column(stamped, FIELD_DATA_UPDATER)?,
            create_time: metadata_column(stamped, FIELD_CREATE_TIME)?,
            update_time: metadata_column(stamped, FIELD_UPDATE_TIME)?,
            data_json,
        })
    }

    /// Rebuilds the full record: parsed document plus the metadata columns.
    /// An unparseable document yields a metadata-only record.
    fn into_record(self) -> RecordFields {
        let mut record = match serde_json::from_str::<JsonValue>(&self.data_json) {
            Ok(JsonValue::Object(map)) => map,
            _ => RecordFields::new(),
        };
        record.insert(FIELD_ID.to_string(), JsonValue::String(self.id));
        record.insert(FIELD_DATA_CREATOR.to_string(), JsonValue::String(self.data_creator));
        record.insert(FIELD_DATA_UPDATER.to_string(), JsonValue::String(self.data_updater));
        record.insert(FIELD_CREATE_TIME.to_string(), JsonValue::String(self.create_time));
        record.insert(FIELD_UPDATE_TIME.to_string(), JsonValue::String(self.update_time));
        record
    }
}

/// Reads one stamped metadata field as a column value.
fn metadata_column(stamped: &RecordFields, name: &str) -> Result<String, SqliteStoreError> {
    stamped
        .get(name)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("stamped record missing {name}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    entity_key TEXT NOT NULL,
                    id TEXT NOT NULL,
                    data_creator TEXT NOT NULL,
                    data_updater TEXT NOT NULL,
                    create_time TEXT NOT NULL,
                    update_time TEXT NOT NULL,
                    data_json TEXT NOT NULL,
                    PRIMARY KEY (entity_key, id)
                );
                CREATE INDEX IF NOT EXISTS idx_records_entity
                    ON records (entity_key);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
