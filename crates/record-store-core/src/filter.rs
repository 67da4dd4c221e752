// crates/record-store-core/src/filter.rs
// ============================================================================
// Module: Filter Engine
// Description: Simple and compound predicate evaluation over decoded records.
// Purpose: Implement the query language's operator semantics in one place.
// Dependencies: serde, serde_json, regex
// ============================================================================

//! ## Overview
//! A [`Filter`] is a predicate tree with two layers: simple selectors that
//! must all hold, and compound selectors (and/or/nor over simple selectors)
//! that are each evaluated and then ANDed with the simple-selector result.
//! Unknown or reserved operators are always-true: a filter never rejects a
//! request, it only narrows results. An empty filter matches everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::entity::RecordFields;
use crate::value::Field;
use crate::value::Value;
use crate::value::decode;
use crate::value::decode_fields;

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Single-field comparison operator.
///
/// # Invariants
/// - Wire tags are stable; unknown tags map to [`ComparisonOp::Reserved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ComparisonOp {
    /// Deep equality (tag 1).
    Equal,
    /// Deep inequality (tag 2).
    NotEqual,
    /// Case-insensitive substring (tag 3).
    Similar,
    /// Negated substring (tag 4).
    NotSimilar,
    /// Regular-expression test (tag 5).
    Match,
    /// Negated regular-expression test (tag 6).
    NotMatch,
    /// Numeric greater-than (tag 7).
    Greater,
    /// Numeric greater-or-equal (tag 8).
    GreaterOrEqual,
    /// Numeric less-than (tag 9).
    Less,
    /// Numeric less-or-equal (tag 10).
    LessOrEqual,
    /// List membership (tag 11).
    In,
    /// Negated list membership (tag 12).
    NotIn,
    /// Field present and non-null (tag 14).
    Exists,
    /// Field absent or null (tag 15).
    NotExists,
    /// Reserved or unknown operator; always true.
    #[default]
    Reserved,
}

impl From<i64> for ComparisonOp {
    fn from(tag: i64) -> Self {
        match tag {
            1 => Self::Equal,
            2 => Self::NotEqual,
            3 => Self::Similar,
            4 => Self::NotSimilar,
            5 => Self::Match,
            6 => Self::NotMatch,
            7 => Self::Greater,
            8 => Self::GreaterOrEqual,
            9 => Self::Less,
            10 => Self::LessOrEqual,
            11 => Self::In,
            12 => Self::NotIn,
            14 => Self::Exists,
            15 => Self::NotExists,
            _ => Self::Reserved,
        }
    }
}

impl From<ComparisonOp> for i64 {
    fn from(op: ComparisonOp) -> Self {
        match op {
            ComparisonOp::Equal => 1,
            ComparisonOp::NotEqual => 2,
            ComparisonOp::Similar => 3,
            ComparisonOp::NotSimilar => 4,
            ComparisonOp::Match => 5,
            ComparisonOp::NotMatch => 6,
            ComparisonOp::Greater => 7,
            ComparisonOp::GreaterOrEqual => 8,
            ComparisonOp::Less => 9,
            ComparisonOp::LessOrEqual => 10,
            ComparisonOp::In => 11,
            ComparisonOp::NotIn => 12,
            ComparisonOp::Exists => 14,
            ComparisonOp::NotExists => 15,
            ComparisonOp::Reserved => 13,
        }
    }
}

/// Compound selector combinator.
///
/// # Invariants
/// - Wire tags are stable; unknown tags map to [`CombinatorOp::Reserved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CombinatorOp {
    /// All sub-selectors must hold (tag 1).
    And,
    /// At least one sub-selector must hold (tag 2).
    Or,
    /// No sub-selector may hold (tag 3).
    Nor,
    /// Reserved or unknown combinator; the clause is ignored.
    #[default]
    Reserved,
}

impl From<i64> for CombinatorOp {
    fn from(tag: i64) -> Self {
        match tag {
            1 => Self::And,
            2 => Self::Or,
            3 => Self::Nor,
            _ => Self::Reserved,
        }
    }
}

impl From<CombinatorOp> for i64 {
    fn from(op: CombinatorOp) -> Self {
        match op {
            CombinatorOp::And => 1,
            CombinatorOp::Or => 2,
            CombinatorOp::Nor => 3,
            CombinatorOp::Reserved => 4,
        }
    }
}

// ============================================================================
// SECTION: Filter Model
// ============================================================================

/// Single-field comparison predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleSelector {
    /// Record field the predicate reads.
    #[serde(default)]
    pub field: String,
    /// Comparison operator.
    #[serde(default)]
    pub symbol: ComparisonOp,
    /// Operand value, absent for existence checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Compound predicate combining simple selectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiSelector {
    /// Combinator applied to the sub-selector results.
    #[serde(default)]
    pub symbol: CombinatorOp,
    /// Sub-selectors evaluated against the record.
    #[serde(default)]
    pub value: Vec<SimpleSelector>,
}

/// Predicate tree: simple selectors ANDed with compound clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Simple selectors; all must hold.
    #[serde(default)]
    pub simples: Vec<SimpleSelector>,
    /// Compound clauses; each must hold per its combinator.
    #[serde(default)]
    pub multiples: Vec<MultiSelector>,
}

/// Equality-only lookup key: field names with parallel values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Record fields forming the natural key.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Values the named fields must equal, carried as named wire values.
    #[serde(default)]
    pub values: Vec<Field>,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a filter against a decoded record.
#[must_use]
pub fn matches(record: &RecordFields, filter: &Filter) -> bool {
    if !filter.simples.iter().all(|simple| matches_simple(record, simple)) {
        return false;
    }
    for multi in &filter.multiples {
        let results: Vec<bool> =
            multi.value.iter().map(|simple| matches_simple(record, simple)).collect();
        let veto = match multi.symbol {
            CombinatorOp::And => !results.iter().all(|hit| *hit),
            CombinatorOp::Or => !results.iter().any(|hit| *hit),
            CombinatorOp::Nor => results.iter().any(|hit| *hit),
            CombinatorOp::Reserved => false,
        };
        if veto {
            return false;
        }
    }
    true
}

/// Evaluates one simple selector against a decoded record.
fn matches_simple(record: &RecordFields, selector: &SimpleSelector) -> bool {
    let field = record.get(&selector.field);
    let operand = selector.value.as_ref().map(decode);
    match selector.symbol {
        ComparisonOp::Equal => option_equal(field, operand.as_ref()),
        ComparisonOp::NotEqual => !option_equal(field, operand.as_ref()),
        ComparisonOp::Greater => compare_numbers(field, operand.as_ref(), |a, b| a > b),
        ComparisonOp::GreaterOrEqual => compare_numbers(field, operand.as_ref(), |a, b| a >= b),
        ComparisonOp::Less => compare_numbers(field, operand.as_ref(), |a, b| a < b),
        ComparisonOp::LessOrEqual => compare_numbers(field, operand.as_ref(), |a, b| a <= b),
        ComparisonOp::In => membership(field, operand.as_ref()).unwrap_or(false),
        ComparisonOp::NotIn => membership(field, operand.as_ref()).is_none_or(|hit| !hit),
        ComparisonOp::Exists => field.is_some_and(|value| !value.is_null()),
        ComparisonOp::NotExists => !field.is_some_and(|value| !value.is_null()),
        ComparisonOp::Similar => is_similar(field, operand.as_ref()),
        ComparisonOp::NotSimilar => !is_similar(field, operand.as_ref()),
        ComparisonOp::Match => is_pattern_match(field, operand.as_ref()),
        ComparisonOp::NotMatch => !is_pattern_match(field, operand.as_ref()),
        ComparisonOp::Reserved => true,
    }
}

/// Deep equality where a doubly-absent value still counts as equal.
fn option_equal(a: Option<&JsonValue>, b: Option<&JsonValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => value_equal(a, b),
        _ => false,
    }
}

/// Structural equality with numeric values compared by magnitude, so the
/// integral and floating encodings of the same number are equal.
fn value_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| value_equal(x, y))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| value_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Coerces a native value to a number the way loosely-typed callers expect:
/// numeric strings parse, booleans become 0/1, null becomes 0, and composite
/// values are not numbers.
#[must_use]
pub fn coerce_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Null => Some(0.0),
        JsonValue::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Applies a numeric comparison; non-numeric sides compare false.
fn compare_numbers(
    field: Option<&JsonValue>,
    operand: Option<&JsonValue>,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    match (field.and_then(coerce_number), operand.and_then(coerce_number)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Membership of the record value in a list operand. `None` means the
/// operand was not a list.
fn membership(field: Option<&JsonValue>, operand: Option<&JsonValue>) -> Option<bool> {
    let Some(JsonValue::Array(items)) = operand else {
        return None;
    };
    let Some(field) = field else {
        return Some(false);
    };
    Some(items.iter().any(|item| value_equal(item, field)))
}

/// Case-insensitive substring test over the string forms of both sides.
fn is_similar(field: Option<&JsonValue>, operand: Option<&JsonValue>) -> bool {
    match (field, operand) {
        (Some(field), Some(operand)) => {
            value_text(field).to_lowercase().contains(&value_text(operand).to_lowercase())
        }
        _ => false,
    }
}

/// Regular-expression test of the field's string form against the operand
/// pattern. Invalid patterns or absent sides fail the match.
fn is_pattern_match(field: Option<&JsonValue>, operand: Option<&JsonValue>) -> bool {
    let (Some(field), Some(operand)) = (field, operand) else {
        return false;
    };
    Regex::new(&value_text(operand)).is_ok_and(|pattern| pattern.is_match(&value_text(field)))
}

/// String form of a native value used by the text operators.
fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(flag) => flag.to_string(),
        JsonValue::Number(number) => number.to_string(),
        JsonValue::String(text) => text.clone(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

// ============================================================================
// SECTION: Index Lookup
// ============================================================================

/// Returns the records whose named fields all equal the index values.
///
/// The lookup is equality-only: every field in the index must match. Records
/// are compared against the decoded index values by field name.
#[must_use]
pub fn find_by_index(records: &[RecordFields], index: &Index) -> Vec<RecordFields> {
    let keys = decode_fields(&index.values);
    records
        .iter()
        .filter(|record| {
            index.fields.iter().all(|field| option_equal(record.get(field), keys.get(field)))
        })
        .cloned()
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::ComparisonOp;
    use super::Filter;
    use super::SimpleSelector;
    use super::matches;
    use crate::entity::RecordFields;
    use crate::value::Value;
    use crate::value::encode;

    fn record(value: serde_json::Value) -> RecordFields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => RecordFields::new(),
        }
    }

    fn simple(field: &str, symbol: ComparisonOp, value: serde_json::Value) -> SimpleSelector {
        SimpleSelector {
            field: field.to_string(),
            symbol,
            value: Some(encode(&value)),
        }
    }

    #[test]
    fn numeric_string_fields_compare_numerically() {
        let filter = Filter {
            simples: vec![simple("score", ComparisonOp::Greater, json!(5))],
            multiples: Vec::new(),
        };
        assert!(matches(&record(json!({ "score": "7" })), &filter));
        assert!(!matches(&record(json!({ "score": "3" })), &filter));
    }

    #[test]
    fn missing_field_fails_numeric_comparisons() {
        let filter = Filter {
            simples: vec![simple("score", ComparisonOp::Less, json!(5))],
            multiples: Vec::new(),
        };
        assert!(!matches(&record(json!({})), &filter));
    }

    #[test]
    fn not_in_with_non_list_operand_passes() {
        let filter = Filter {
            simples: vec![simple("x", ComparisonOp::NotIn, json!("not-a-list"))],
            multiples: Vec::new(),
        };
        assert!(matches(&record(json!({ "x": 1 })), &filter));
    }

    #[test]
    fn similar_is_case_insensitive_substring() {
        let filter = Filter {
            simples: vec![simple("name", ComparisonOp::Similar, json!("WID"))],
            multiples: Vec::new(),
        };
        assert!(matches(&record(json!({ "name": "widget-7" })), &filter));
        assert!(!matches(&record(json!({ "name": "gadget" })), &filter));
    }

    #[test]
    fn pattern_match_uses_regex_and_fails_closed_on_bad_patterns() {
        let filter = Filter {
            simples: vec![simple("name", ComparisonOp::Match, json!("^wid.*7$"))],
            multiples: Vec::new(),
        };
        assert!(matches(&record(json!({ "name": "widget-7" })), &filter));

        let broken = Filter {
            simples: vec![simple("name", ComparisonOp::Match, json!("(unclosed"))],
            multiples: Vec::new(),
        };
        assert!(!matches(&record(json!({ "name": "widget-7" })), &broken));
    }

    #[test]
    fn reserved_operator_is_always_true() {
        let selector = SimpleSelector {
            field: "x".to_string(),
            symbol: ComparisonOp::Reserved,
            value: Some(Value::Number(99.0)),
        };
        let filter = Filter {
            simples: vec![selector],
            multiples: Vec::new(),
        };
        assert!(matches(&record(json!({ "x": 1 })), &filter));
        assert!(matches(&record(json!({})), &filter));
    }

    #[test]
    fn equal_treats_integral_and_float_encodings_alike() {
        let filter = Filter {
            simples: vec![simple("x", ComparisonOp::Equal, json!(1.0))],
            multiples: Vec::new(),
        };
        assert!(matches(&record(json!({ "x": 1 })), &filter));
    }
}
