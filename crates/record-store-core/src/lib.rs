// crates/record-store-core/src/lib.rs
// ============================================================================
// Module: Record Store Core
// Description: Value codec, query engine, and storage contract for the store.
// Purpose: Provide the backend-agnostic building blocks of the record store.
// Dependencies: serde, serde_json, thiserror, regex, uuid
// ============================================================================

//! ## Overview
//! Core building blocks of the record store: the tagged [`Value`] wire
//! representation and its total codec, the filter engine, the
//! filter/sort/paginate query pipeline, the [`RecordStore`] storage contract,
//! and the single-file backend used for local development. Everything here is
//! backend-agnostic; the relational backend lives in `record-store-sqlite`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod entity;
pub mod filter;
pub mod query;
pub mod store;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use entity::EntityKey;
pub use entity::RecordFields;
pub use entity::RecordMeta;
pub use entity::WRITER_LOCAL;
pub use entity::now_seconds;
pub use entity::stamp_record;
pub use filter::CombinatorOp;
pub use filter::ComparisonOp;
pub use filter::Filter;
pub use filter::Index;
pub use filter::MultiSelector;
pub use filter::SimpleSelector;
pub use filter::coerce_number;
pub use filter::find_by_index;
pub use filter::matches;
pub use query::PageInfo;
pub use query::Paginate;
pub use query::Sort;
pub use query::SortDirection;
pub use query::SortOrder;
pub use query::run_query;
pub use store::FileRecordStore;
pub use store::RecordStore;
pub use store::SharedRecordStore;
pub use store::StoreError;
pub use value::DataPayload;
pub use value::Field;
pub use value::Value;
pub use value::decode;
pub use value::decode_fields;
pub use value::encode;
pub use value::encode_fields;
pub use value::number_value;
