// crates/record-store-core/src/value.rs
// ============================================================================
// Module: Value Codec
// Description: Tagged recursive wire values and the total native codec.
// Purpose: Round-trip arbitrary nested data without a fixed schema.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The wire protocol carries every piece of record data as a tagged,
//! recursively-structured [`Value`]. This module defines the closed sum type,
//! its flat wire form, and the codec between wire values and native
//! [`serde_json::Value`] data. Both directions are total: malformed or
//! unknown input degrades to the most permissive default for its declared
//! kind instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::entity::RecordFields;

// ============================================================================
// SECTION: Wire Kind Tags
// ============================================================================

/// Wire tag for string values.
const KIND_STRING: i64 = 1;
/// Wire tag for numeric values.
const KIND_NUMBER: i64 = 2;
/// Wire tag for boolean values.
const KIND_BOOLEAN: i64 = 3;
/// Wire tag for enumeration values.
const KIND_ENUMERATION: i64 = 100;
/// Wire tag for positionally-named arrays.
const KIND_ARRAY: i64 = 101;
/// Wire tag for named-field objects.
const KIND_OBJECT: i64 = 102;
/// Wire tag for references (decoded identically to objects).
const KIND_REFERENCE: i64 = 103;

/// Largest magnitude at which every integral `f64` is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

// ============================================================================
// SECTION: Value Model
// ============================================================================

/// One tagged wire value.
///
/// # Invariants
/// - Exactly one payload is meaningful per kind.
/// - `Array` children are positionally named; `Object`/`Reference` children
///   carry field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireValue", into = "WireValue")]
pub enum Value {
    /// UTF-8 string payload.
    String(String),
    /// Numeric payload (`f64` on the wire).
    Number(f64),
    /// Boolean payload.
    Boolean(bool),
    /// Enumeration payload (integral code).
    Enumeration(i64),
    /// Ordered, positionally-named children.
    Array(Vec<Field>),
    /// Ordered, named children.
    Object(Vec<Field>),
    /// Reference payload; decodes identically to an object.
    Reference(Vec<Field>),
}

/// A named child value inside an object, reference, or array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireValue", into = "WireValue")]
pub struct Field {
    /// Child name (a field name, or a decimal position inside arrays).
    pub name: String,
    /// Child value.
    pub value: Value,
}

impl Field {
    /// Creates a named child value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

// ============================================================================
// SECTION: Wire Form
// ============================================================================

/// Flat wire representation of a value: a numeric kind tag plus one payload
/// slot per kind. Unknown tags and missing payloads convert to permissive
/// defaults, which keeps decoding total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireValue {
    /// Numeric kind tag.
    #[serde(rename = "type", default)]
    kind: i64,
    /// Child name when the value is a named field.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    /// String payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string: Option<String>,
    /// Numeric payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number: Option<f64>,
    /// Boolean payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    boolean: Option<bool>,
    /// Enumeration payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enumeration: Option<i64>,
    /// Array children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    array: Vec<WireValue>,
    /// Object or reference children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    object: Vec<WireValue>,
}

impl From<WireValue> for Value {
    fn from(wire: WireValue) -> Self {
        match wire.kind {
            KIND_STRING => Self::String(wire.string.unwrap_or_default()),
            KIND_NUMBER => Self::Number(wire.number.unwrap_or_default()),
            KIND_BOOLEAN => Self::Boolean(wire.boolean.unwrap_or_default()),
            KIND_ENUMERATION => Self::Enumeration(wire.enumeration.unwrap_or_default()),
            KIND_ARRAY => Self::Array(wire.array.into_iter().map(Field::from).collect()),
            KIND_OBJECT => Self::Object(wire.object.into_iter().map(Field::from).collect()),
            KIND_REFERENCE => Self::Reference(wire.object.into_iter().map(Field::from).collect()),
            _ => Self::String(String::new()),
        }
    }
}

impl From<WireValue> for Field {
    fn from(mut wire: WireValue) -> Self {
        let name = std::mem::take(&mut wire.name);
        Self {
            name,
            value: Value::from(wire),
        }
    }
}

impl From<Value> for WireValue {
    fn from(value: Value) -> Self {
        named_wire(String::new(), value)
    }
}

impl From<Field> for WireValue {
    fn from(field: Field) -> Self {
        named_wire(field.name, field.value)
    }
}

/// Builds the flat wire form for a value under the given child name.
fn named_wire(name: String, value: Value) -> WireValue {
    let mut wire = WireValue {
        name,
        ..WireValue::default()
    };
    match value {
        Value::String(string) => {
            wire.kind = KIND_STRING;
            wire.string = Some(string);
        }
        Value::Number(number) => {
            wire.kind = KIND_NUMBER;
            wire.number = Some(number);
        }
        Value::Boolean(boolean) => {
            wire.kind = KIND_BOOLEAN;
            wire.boolean = Some(boolean);
        }
        Value::Enumeration(code) => {
            wire.kind = KIND_ENUMERATION;
            wire.enumeration = Some(code);
        }
        Value::Array(items) => {
            wire.kind = KIND_ARRAY;
            wire.array = items.into_iter().map(WireValue::from).collect();
        }
        Value::Object(fields) => {
            wire.kind = KIND_OBJECT;
            wire.object = fields.into_iter().map(WireValue::from).collect();
        }
        Value::Reference(fields) => {
            wire.kind = KIND_REFERENCE;
            wire.object = fields.into_iter().map(WireValue::from).collect();
        }
    }
    wire
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a wire value into native data. Total: every value decodes.
#[must_use]
pub fn decode(value: &Value) -> JsonValue {
    match value {
        Value::String(string) => JsonValue::String(string.clone()),
        Value::Number(number) => number_value(*number),
        Value::Boolean(boolean) => JsonValue::Bool(*boolean),
        Value::Enumeration(code) => JsonValue::from(*code),
        Value::Array(items) => {
            JsonValue::Array(items.iter().map(|item| decode(&item.value)).collect())
        }
        Value::Object(fields) | Value::Reference(fields) => {
            JsonValue::Object(decode_fields(fields))
        }
    }
}

/// Decodes a sequence of named values into a native mapping. Children with
/// empty names are dropped.
#[must_use]
pub fn decode_fields(fields: &[Field]) -> RecordFields {
    let mut map = RecordFields::new();
    for field in fields {
        if field.name.is_empty() {
            continue;
        }
        map.insert(field.name.clone(), decode(&field.value));
    }
    map
}

/// Converts an `f64` into a native JSON number, preferring the integral form
/// when it is exact so decoded data compares equal to its source.
#[must_use]
pub fn number_value(number: f64) -> JsonValue {
    if number.is_finite() && number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "Guarded by fract and safe-integer range checks above."
        )]
        return JsonValue::from(number as i64);
    }
    serde_json::Number::from_f64(number).map_or_else(|| JsonValue::from(0), JsonValue::Number)
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes native data into a wire value, inferring the kind from the native
/// runtime shape. Unrecognized shapes (null) encode as an empty string.
#[must_use]
pub fn encode(native: &JsonValue) -> Value {
    match native {
        JsonValue::Null => Value::String(String::new()),
        JsonValue::Bool(boolean) => Value::Boolean(*boolean),
        JsonValue::Number(number) => Value::Number(number.as_f64().unwrap_or_default()),
        JsonValue::String(string) => Value::String(string.clone()),
        JsonValue::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| Field::new(index.to_string(), encode_array_item(item)))
                .collect(),
        ),
        JsonValue::Object(map) => Value::Object(encode_fields(map)),
    }
}

/// Encodes a native mapping into a sequence of named wire values.
#[must_use]
pub fn encode_fields(map: &RecordFields) -> Vec<Field> {
    map.iter().map(|(name, value)| Field::new(name.clone(), encode(value))).collect()
}

/// Encodes one array element. Each element carries its own inferred kind,
/// which supports heterogeneous arrays; nested arrays are not re-encoded and
/// become empty arrays.
fn encode_array_item(item: &JsonValue) -> Value {
    match item {
        JsonValue::Array(_) => Value::Array(Vec::new()),
        other => encode(other),
    }
}

// ============================================================================
// SECTION: Data Payload
// ============================================================================

/// Record data as carried on the wire: a structured value tree, a
/// pre-serialized JSON blob, or both.
///
/// # Invariants
/// - When both forms are present the serialized blob is ground truth and the
///   value tree is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    /// Structured value tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Vec<Field>>,
    /// Pre-serialized JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized: Option<String>,
}

impl DataPayload {
    /// Builds a structured payload from a native record mapping.
    #[must_use]
    pub fn from_record(record: &RecordFields) -> Self {
        Self {
            structured: Some(encode_fields(record)),
            serialized: None,
        }
    }

    /// Decodes the payload into a native record mapping. Unparseable or
    /// non-object serialized blobs decode to an empty mapping.
    #[must_use]
    pub fn decode_record(&self) -> RecordFields {
        if let Some(serialized) = &self.serialized {
            return match serde_json::from_str::<JsonValue>(serialized) {
                Ok(JsonValue::Object(map)) => map,
                _ => RecordFields::new(),
            };
        }
        self.structured.as_deref().map(decode_fields).unwrap_or_default()
    }
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
        clippy::panic_in_result_fn,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::DataPayload;
    use super::Field;
    use super::Value;
    use super::decode;
    use super::encode;

    #[test]
    fn unknown_kind_decodes_to_empty_string() {
        let value: Value = serde_json::from_value(json!({ "type": 42 })).unwrap();
        assert_eq!(decode(&value), json!(""));
    }

    #[test]
    fn missing_payload_decodes_to_kind_default() {
        let value: Value = serde_json::from_value(json!({ "type": 2 })).unwrap();
        assert_eq!(decode(&value), json!(0));
        let value: Value = serde_json::from_value(json!({ "type": 3 })).unwrap();
        assert_eq!(decode(&value), json!(false));
    }

    #[test]
    fn reference_decodes_like_object() {
        let value = Value::Reference(vec![Field::new("id", Value::String("r-1".to_string()))]);
        assert_eq!(decode(&value), json!({ "id": "r-1" }));
    }

    #[test]
    fn nameless_object_children_are_dropped() {
        let value: Value = serde_json::from_value(json!({
            "type": 102,
            "object": [
                { "type": 1, "name": "kept", "string": "x" },
                { "type": 1, "string": "dropped" },
            ],
        }))
        .unwrap();
        assert_eq!(decode(&value), json!({ "kept": "x" }));
    }

    #[test]
    fn serialized_blob_takes_priority_over_structured() {
        let payload = DataPayload {
            structured: Some(vec![Field::new("name", Value::String("tree".to_string()))]),
            serialized: Some(r#"{"name":"blob"}"#.to_string()),
        };
        assert_eq!(payload.decode_record().get("name"), Some(&json!("blob")));
    }

    #[test]
    fn unparseable_serialized_blob_decodes_to_empty() {
        let payload = DataPayload {
            structured: None,
            serialized: Some("{not json".to_string()),
        };
        assert!(payload.decode_record().is_empty());
    }

    #[test]
    fn nested_array_items_encode_as_empty_arrays() {
        let encoded = encode(&json!([[1, 2], "x"]));
        let Value::Array(items) = encoded else {
            panic!("expected array encoding");
        };
        assert_eq!(items[0].value, Value::Array(Vec::new()));
        assert_eq!(items[1].value, Value::String("x".to_string()));
    }
}
