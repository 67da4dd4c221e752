// crates/record-store-core/src/entity.rs
// ============================================================================
// Module: Entity and Record Model
// Description: Entity keys, record mappings, and store-managed metadata.
// Purpose: Define the partitioning and metadata rules shared by all backends.
// Dependencies: serde, serde_json, uuid
// ============================================================================

//! ## Overview
//! Records are schema-less native mappings partitioned by an [`EntityKey`]
//! (`namespace:name`). The store manages five metadata fields inside every
//! record: `id`, `data_creator`, `data_updater`, `create_time`, and
//! `update_time`. [`stamp_record`] is the single place those rules live so
//! the relational and file backends cannot drift apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metadata field holding the record identifier.
pub const FIELD_ID: &str = "id";
/// Metadata field holding the original writer.
pub const FIELD_DATA_CREATOR: &str = "data_creator";
/// Metadata field holding the latest writer.
pub const FIELD_DATA_UPDATER: &str = "data_updater";
/// Metadata field holding the creation timestamp (decimal seconds).
pub const FIELD_CREATE_TIME: &str = "create_time";
/// Metadata field holding the last-update timestamp (decimal seconds).
pub const FIELD_UPDATE_TIME: &str = "update_time";
/// Writer label recorded for every local write.
pub const WRITER_LOCAL: &str = "local";

// ============================================================================
// SECTION: Entity Key
// ============================================================================

/// A decoded record: a native mapping with metadata fields merged in.
pub type RecordFields = serde_json::Map<String, JsonValue>;

/// Namespace-qualified logical table name scoping a family of records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Builds an entity key from its namespace and name parts.
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}:{name}"))
    }

    /// Wraps an already-joined entity key.
    #[must_use]
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self::from_raw(value)
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self::from_raw(value)
    }
}

// ============================================================================
// SECTION: Record Metadata
// ============================================================================

/// The metadata carried forward when an existing record is rewritten.
///
/// # Invariants
/// - `id` and `create_time` never change once a record exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    /// Opaque unique record identifier.
    pub id: String,
    /// Writer that created the record.
    pub data_creator: String,
    /// Creation timestamp, decimal seconds as a string.
    pub create_time: String,
}

impl RecordMeta {
    /// Extracts carry-forward metadata from a stored record, when present.
    #[must_use]
    pub fn from_fields(fields: &RecordFields) -> Option<Self> {
        let id = string_field(fields, FIELD_ID)?;
        Some(Self {
            id,
            data_creator: string_field(fields, FIELD_DATA_CREATOR).unwrap_or_default(),
            create_time: string_field(fields, FIELD_CREATE_TIME).unwrap_or_default(),
        })
    }
}

/// Reads a non-empty string field from a record.
fn string_field(fields: &RecordFields, name: &str) -> Option<String> {
    match fields.get(name) {
        Some(JsonValue::String(value)) if !value.is_empty() => Some(value.clone()),
        _ => None,
    }
}

/// Returns the current wall-clock time as decimal seconds in a string.
#[must_use]
pub fn now_seconds() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    now.as_secs().to_string()
}

/// Stamps store-managed metadata onto a record prior to persisting it.
///
/// When `existing` is given its `id`, `data_creator`, and `create_time` are
/// carried forward; otherwise they come from the incoming fields or are
/// minted fresh (`id` as a random UUID, `create_time` as now). `update_time`
/// and `data_updater` are rewritten on every call.
#[must_use]
pub fn stamp_record(mut fields: RecordFields, existing: Option<&RecordMeta>) -> RecordFields {
    let now = now_seconds();
    let id = existing
        .map(|meta| meta.id.clone())
        .or_else(|| string_field(&fields, FIELD_ID))
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let data_creator = existing
        .map(|meta| meta.data_creator.clone())
        .filter(|creator| !creator.is_empty())
        .or_else(|| string_field(&fields, FIELD_DATA_CREATOR))
        .unwrap_or_else(|| WRITER_LOCAL.to_string());
    let create_time = existing
        .map(|meta| meta.create_time.clone())
        .filter(|time| !time.is_empty())
        .or_else(|| string_field(&fields, FIELD_CREATE_TIME))
        .unwrap_or_else(|| now.clone());
    fields.insert(FIELD_ID.to_string(), JsonValue::String(id));
    fields.insert(FIELD_DATA_CREATOR.to_string(), JsonValue::String(data_creator));
    fields.insert(FIELD_DATA_UPDATER.to_string(), JsonValue::String(WRITER_LOCAL.to_string()));
    fields.insert(FIELD_CREATE_TIME.to_string(), JsonValue::String(create_time));
    fields.insert(FIELD_UPDATE_TIME.to_string(), JsonValue::String(now));
    fields
}

// ============================================================================
// SECTION: Tests
// ============================================================================
