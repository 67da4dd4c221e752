// crates/record-store-core/src/query.rs
// ============================================================================
// Module: Query Pipeline
// Description: Filter, sort, and paginate over decoded record collections.
// Purpose: Compose the list operation as a pure function over its inputs.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The query pipeline runs filter → sort → paginate over a collection of
//! decoded records and reports page metadata. It is a pure function: no
//! backend interaction, no side effects. Sorting is a stable multi-key sort
//! with a total comparison, and the reported `total` is always the count
//! after filtering but before slicing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::entity::RecordFields;
use crate::filter::Filter;
use crate::filter::matches;

// ============================================================================
// SECTION: Sort Model
// ============================================================================

/// Sort direction for one sort key.
///
/// # Invariants
/// - Wire tag 2 means descending; every other tag is ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SortDirection {
    /// Ascending order (default).
    #[default]
    Ascending,
    /// Descending order (tag 2).
    Descending,
}

impl From<i64> for SortDirection {
    fn from(tag: i64) -> Self {
        if tag == 2 { Self::Descending } else { Self::Ascending }
    }
}

impl From<SortDirection> for i64 {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => 2,
        }
    }
}

/// One (field, direction) sort key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Record field to sort by.
    #[serde(default)]
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub symbol: SortDirection,
}

/// Ordered list of sort keys; later keys break ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Sort keys in priority order.
    #[serde(default)]
    pub orders: Vec<SortOrder>,
}

// ============================================================================
// SECTION: Pagination Model
// ============================================================================

/// Requested page window. Size zero or an absent spec means "everything".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginate {
    /// Zero-based page number.
    #[serde(default)]
    pub number: u64,
    /// Page size; zero disables paging.
    #[serde(default)]
    pub size: u64,
}

/// Page metadata reported with query results.
///
/// # Invariants
/// - `total` counts matches before slicing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Zero-based page number returned.
    pub number: u64,
    /// Page size used for the slice.
    pub size: u64,
    /// Match count before slicing.
    pub total: u64,
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Runs filter → sort → paginate and returns the page with its metadata.
#[must_use]
pub fn run_query(
    records: Vec<RecordFields>,
    filter: Option<&Filter>,
    sort: Option<&Sort>,
    paginate: Option<&Paginate>,
) -> (Vec<RecordFields>, PageInfo) {
    let mut filtered: Vec<RecordFields> = match filter {
        Some(filter) => records.into_iter().filter(|record| matches(record, filter)).collect(),
        None => records,
    };
    sort_records(&mut filtered, sort);
    paginate_records(filtered, paginate)
}

/// Stable multi-key sort; records equal across all keys keep input order.
pub fn sort_records(records: &mut [RecordFields], sort: Option<&Sort>) {
    let Some(sort) = sort else {
        return;
    };
    if sort.orders.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for order in &sort.orders {
            let ordering = compare_values(a.get(&order.field), b.get(&order.field));
            if ordering != Ordering::Equal {
                return match order.symbol {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                };
            }
        }
        Ordering::Equal
    });
}

/// Slices the page window and reports page metadata.
#[must_use]
pub fn paginate_records(
    records: Vec<RecordFields>,
    paginate: Option<&Paginate>,
) -> (Vec<RecordFields>, PageInfo) {
    let total = u64::try_from(records.len()).unwrap_or(u64::MAX);
    let Some(paginate) = paginate.filter(|spec| spec.size > 0) else {
        let page = PageInfo {
            number: 0,
            size: total,
            total,
        };
        return (records, page);
    };
    let start = usize::try_from(paginate.number.saturating_mul(paginate.size))
        .unwrap_or(usize::MAX)
        .min(records.len());
    let end = usize::try_from(paginate.size)
        .map_or(records.len(), |size| start.saturating_add(size).min(records.len()));
    let page = PageInfo {
        number: paginate.number,
        size: paginate.size,
        total,
    };
    (records[start..end].to_vec(), page)
}

/// Total comparison over native values: kinds rank null < boolean < number <
/// string < array < object, then values compare within their kind.
/// Composite values compare by their serialized form.
fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let rank_a = kind_rank(a);
    let rank_b = kind_rank(b);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Some(JsonValue::Bool(a)), Some(JsonValue::Bool(b))) => a.cmp(b),
        (Some(JsonValue::Number(a)), Some(JsonValue::Number(b))) => {
            a.as_f64().unwrap_or_default().total_cmp(&b.as_f64().unwrap_or_default())
        }
        (Some(JsonValue::String(a)), Some(JsonValue::String(b))) => a.cmp(b),
        (Some(a @ (JsonValue::Array(_) | JsonValue::Object(_))), Some(b)) => {
            serde_json::to_string(a)
                .unwrap_or_default()
                .cmp(&serde_json::to_string(b).unwrap_or_default())
        }
        _ => Ordering::Equal,
    }
}

/// Rank used to order values of different kinds.
const fn kind_rank(value: Option<&JsonValue>) -> u8 {
    match value {
        None | Some(JsonValue::Null) => 0,
        Some(JsonValue::Bool(_)) => 1,
        Some(JsonValue::Number(_)) => 2,
        Some(JsonValue::String(_)) => 3,
        Some(JsonValue::Array(_)) => 4,
        Some(JsonValue::Object(_)) => 5,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
