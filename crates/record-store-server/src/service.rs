// crates/record-store-server/src/service.rs
// ============================================================================
// Module: Store Service
// Description: Verb implementations over the record store contract.
// Purpose: One backend interaction pattern per verb, backend-agnostic.
// Dependencies: record-store-core, serde_json
// ============================================================================

//! ## Overview
//! Each verb resolves the request's entity key, performs one interaction
//! pattern against the injected [`SharedRecordStore`], and returns decoded
//! result records. Absence is never an error: unknown ids, unmatched
//! indexes, and empty filters all produce empty result sets. Encoding back
//! to the wire happens in the transport layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use record_store_core::Index;
use record_store_core::PageInfo;
use record_store_core::RecordFields;
use record_store_core::RecordMeta;
use record_store_core::RecordStore;
use record_store_core::SharedRecordStore;
use record_store_core::StoreError;
use record_store_core::coerce_number;
use record_store_core::entity::FIELD_ID;
use record_store_core::find_by_index;
use record_store_core::number_value;
use record_store_core::run_query;
use serde_json::Value as JsonValue;

use crate::wire::StoreRequest;

// ============================================================================
// SECTION: Service
// ============================================================================

/// Default field mutated by the counter verb.
const FIELD_COUNTER: &str = "counter";

/// Result of one verb: decoded records plus page metadata for paged verbs.
pub type OperationOutput = (Vec<RecordFields>, Option<PageInfo>);

/// Verb implementations over an injected store backend.
#[derive(Clone)]
pub struct StoreService {
    /// Storage backend chosen at startup.
    store: SharedRecordStore,
}

impl StoreService {
    /// Builds a service over the given backend.
    #[must_use]
    pub const fn new(store: SharedRecordStore) -> Self {
        Self {
            store,
        }
    }

    /// Returns every record in the entity, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn all(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let records = self.store.load_all(&request.entity())?;
        Ok((records, None))
    }

    /// Inserts every payload in the batch as a new record.
    ///
    /// No existing-record lookup happens here: duplicate natural keys are
    /// allowed and every payload gets its own identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a write fails.
    pub fn insert(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let entity = request.entity();
        let mut inserted = Vec::new();
        for payload in request.insert_batch() {
            inserted.push(self.store.upsert(&entity, payload.decode_record(), None)?);
        }
        Ok((inserted, None))
    }

    /// Returns records matched by an explicit id list or by one index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn get(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let records = self.store.load_all(&request.entity())?;
        let matches = match (&request.ids, &request.index) {
            (Some(ids), _) if !ids.is_empty() => records
                .into_iter()
                .filter(|record| record_id(record).is_some_and(|id| ids.iter().any(|x| x == id)))
                .collect(),
            (_, Some(index)) => find_by_index(&records, index),
            _ => Vec::new(),
        };
        Ok((matches, None))
    }

    /// Rewrites the record matched by the index, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn set(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let entity = request.entity();
        let records = self.store.load_all(&entity)?;
        let existing = first_index_match(&records, request.index.as_ref());
        let meta = existing.as_ref().and_then(RecordMeta::from_fields);
        let updated =
            self.store.upsert(&entity, request.single_data().decode_record(), meta.as_ref())?;
        Ok((vec![updated], None))
    }

    /// Deletes records named by an explicit id list or matched by one index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn delete(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let entity = request.entity();
        if let Some(ids) = &request.ids
            && !ids.is_empty()
        {
            self.store.delete_by_ids(&entity, ids)?;
            return Ok((Vec::new(), None));
        }
        if let Some(index) = &request.index {
            let records = self.store.load_all(&entity)?;
            let ids: Vec<String> = find_by_index(&records, index)
                .iter()
                .filter_map(|record| record_id(record).map(str::to_string))
                .collect();
            self.store.delete_by_ids(&entity, &ids)?;
        }
        Ok((Vec::new(), None))
    }

    /// Returns the concatenated matches of every index in the batch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn mget(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let records = self.store.load_all(&request.entity())?;
        let indexes = request.indexes.clone().unwrap_or_default();
        let matches =
            indexes.iter().flat_map(|index| find_by_index(&records, index)).collect();
        Ok((matches, None))
    }

    /// Rewrites one record per batch item, aligned positionally with the
    /// index batch. Items without a matching index entry insert fresh.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a write fails.
    pub fn mset(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let entity = request.entity();
        let records = self.store.load_all(&entity)?;
        let indexes = request.indexes.clone().unwrap_or_default();
        let mut updated = Vec::new();
        for (position, payload) in request.data_batch().into_iter().enumerate() {
            let existing = first_index_match(&records, indexes.get(position));
            let meta = existing.as_ref().and_then(RecordMeta::from_fields);
            updated.push(self.store.upsert(&entity, payload.decode_record(), meta.as_ref())?);
        }
        Ok((updated, None))
    }

    /// Runs the filter → sort → paginate pipeline over the entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn list(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let records = self.store.load_all(&request.entity())?;
        let (page, info) = run_query(
            records,
            request.filter.as_ref(),
            request.sort.as_ref(),
            request.paginate.as_ref(),
        );
        Ok((page, Some(info)))
    }

    /// Adds the delta (default 1) to the matched record's counter field.
    ///
    /// An unmatched index yields an empty result set instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn increase_counter(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        let entity = request.entity();
        let records = self.store.load_all(&entity)?;
        let Some(mut record) = first_index_match(&records, request.index.as_ref()) else {
            return Ok((Vec::new(), None));
        };
        let delta = request.delta.unwrap_or(1.0);
        let current = record.get(FIELD_COUNTER).and_then(coerce_number).unwrap_or(0.0);
        record.insert(FIELD_COUNTER.to_string(), number_value(current + delta));
        let meta = RecordMeta::from_fields(&record);
        let updated = self.store.upsert(&entity, record, meta.as_ref())?;
        Ok((vec![updated], None))
    }

    /// Deletes every record in the entity. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn purge(&self, request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        self.store.purge(&request.entity())?;
        Ok((Vec::new(), None))
    }

    /// Ranked aggregation is not implemented; always an empty result set.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other verbs.
    pub fn count_ranked_list(&self, _request: &StoreRequest) -> Result<OperationOutput, StoreError> {
        Ok((Vec::new(), None))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the record id as a string slice.
fn record_id(record: &RecordFields) -> Option<&str> {
    record.get(FIELD_ID).and_then(JsonValue::as_str)
}

/// First record matched by the index, when an index was given.
fn first_index_match(records: &[RecordFields], index: Option<&Index>) -> Option<RecordFields> {
    let index = index?;
    find_by_index(records, index).into_iter().next()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
