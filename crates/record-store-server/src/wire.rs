// crates/record-store-server/src/wire.rs
// ============================================================================
// Module: Wire Protocol
// Description: Request and response shapes for the store verbs.
// Purpose: Parse untrusted request bodies into typed operation inputs.
// Dependencies: record-store-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every verb shares one request shape: an entity scope (`namespace`/`name`)
//! plus whichever operation fields the verb reads. Unknown fields are
//! ignored, absent fields default, and `data` accepts either one payload or a
//! batch. Responses are the uniform envelope `{ code: 0, data: { values,
//! page } }`, with `page` present only for paged operations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use record_store_core::DataPayload;
use record_store_core::EntityKey;
use record_store_core::Filter;
use record_store_core::Index;
use record_store_core::PageInfo;
use record_store_core::Paginate;
use record_store_core::RecordFields;
use record_store_core::Sort;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Record data carried on a request: one payload or a positional batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DataBody {
    /// Positional batch of payloads.
    Many(Vec<DataPayload>),
    /// One payload.
    One(DataPayload),
}

/// One store request body, shared by every verb.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreRequest {
    /// Entity namespace.
    #[serde(default)]
    pub namespace: String,
    /// Entity name.
    #[serde(default)]
    pub name: String,
    /// Explicit record ids for `get`/`delete`.
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    /// Natural-key lookup for single-record verbs.
    #[serde(default)]
    pub index: Option<Index>,
    /// Positional natural-key lookups for batched verbs.
    #[serde(default)]
    pub indexes: Option<Vec<Index>>,
    /// Record data, one payload or a batch.
    #[serde(default)]
    pub data: Option<DataBody>,
    /// Insert batch of payloads.
    #[serde(default)]
    pub batch: Option<Vec<DataPayload>>,
    /// Predicate tree for `list`.
    #[serde(default)]
    pub filter: Option<Filter>,
    /// Sort keys for `list`.
    #[serde(default)]
    pub sort: Option<Sort>,
    /// Page window for `list`.
    #[serde(default)]
    pub paginate: Option<Paginate>,
    /// Counter increment amount.
    #[serde(default)]
    pub delta: Option<f64>,
}

impl StoreRequest {
    /// Resolves the entity key the request is scoped to.
    #[must_use]
    pub fn entity(&self) -> EntityKey {
        EntityKey::new(&self.namespace, &self.name)
    }

    /// Returns the payloads to insert: the batch when given, otherwise the
    /// single `data` payload.
    #[must_use]
    pub fn insert_batch(&self) -> Vec<DataPayload> {
        if let Some(batch) = &self.batch {
            return batch.clone();
        }
        match &self.data {
            Some(DataBody::Many(items)) => items.clone(),
            Some(DataBody::One(payload)) => vec![payload.clone()],
            None => Vec::new(),
        }
    }

    /// Returns the `data` field as a positional batch.
    #[must_use]
    pub fn data_batch(&self) -> Vec<DataPayload> {
        match &self.data {
            Some(DataBody::Many(items)) => items.clone(),
            Some(DataBody::One(payload)) => vec![payload.clone()],
            None => Vec::new(),
        }
    }

    /// Returns the single `data` payload, taking the first of a batch.
    #[must_use]
    pub fn single_data(&self) -> DataPayload {
        match &self.data {
            Some(DataBody::One(payload)) => payload.clone(),
            Some(DataBody::Many(items)) => items.first().cloned().unwrap_or_default(),
            None => DataPayload::default(),
        }
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Success envelope: `code` 0 plus the data section.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    /// Status code, always 0 on success.
    pub code: i64,
    /// Result records and page metadata.
    pub data: DataSection,
}

/// Result section of a success envelope.
#[derive(Debug, Serialize)]
pub struct DataSection {
    /// Encoded result records.
    pub values: Vec<DataPayload>,
    /// Page metadata, present for paged operations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageInfo>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error code string.
    pub error: &'static str,
}

impl ResponseEnvelope {
    /// Builds the success envelope for a set of result records.
    #[must_use]
    pub fn from_records(records: &[RecordFields], page: Option<PageInfo>) -> Self {
        Self {
            code: 0,
            data: DataSection {
                values: records.iter().map(DataPayload::from_record).collect(),
                page,
            },
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
