//! Value and record representations.
//!
//! [`FieldValue`] is the closed set of values a record field can hold and
//! [`Record`] is one keyed instance of a kind. Both are store-agnostic: the
//! text codec in `csv-types` and the store implementations in `entity-store`
//! work only with these types.

use crate::key::Key;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error type for value construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValueError {
    /// A collection element was itself a collection
    #[error("Collections cannot contain collections (element {index})")]
    NestedCollection { index: usize },

    /// Epoch milliseconds outside the representable range
    #[error("Timestamp {0} is out of range")]
    TimestampOutOfRange(i64),
}

/// Value of a single record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Absent or null value
    Null,

    /// Short text
    Text(String),

    /// 64-bit signed integer
    Int64(i64),

    /// 32-bit signed integer
    Int32(i32),

    /// 64-bit floating point
    Float64(f64),

    /// Boolean value
    Bool(bool),

    /// Epoch milliseconds
    Timestamp(i64),

    /// Opaque long text blob
    LongText(String),

    /// Reference to another record
    Reference(Key),

    /// Symbolic enumeration name
    Enum(String),

    /// Multi-valued field; elements are never collections
    Collection(Vec<FieldValue>),
}

impl FieldValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Create a long text value.
    pub fn long_text(value: impl Into<String>) -> Self {
        Self::LongText(value.into())
    }

    /// Create a timestamp value from a UTC date/time.
    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value.timestamp_millis())
    }

    /// Create a collection, rejecting nested collections.
    pub fn collection(elements: Vec<FieldValue>) -> Result<Self, ValueError> {
        if let Some(index) = elements
            .iter()
            .position(|e| matches!(e, FieldValue::Collection(_)))
        {
            return Err(ValueError::NestedCollection { index });
        }
        Ok(Self::Collection(elements))
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as a string reference (text, long text or enum name).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::LongText(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) | Self::Timestamp(i) => Some(*i),
            Self::Int32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as a UTC date/time.
    pub fn as_datetime(&self) -> Result<Option<DateTime<Utc>>, ValueError> {
        match self {
            Self::Timestamp(millis) => Utc
                .timestamp_millis_opt(*millis)
                .single()
                .map(Some)
                .ok_or(ValueError::TimestampOutOfRange(*millis)),
            _ => Ok(None),
        }
    }
}

/// One instance of a kind.
///
/// Fields are kept in a sorted map so iteration order is stable for a given
/// record regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Kind name
    pub kind: String,

    /// Primary reference key
    pub key: Key,

    /// Field values (field name -> value)
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record for the given key. The kind is taken from the key.
    pub fn new(key: Key) -> Self {
        Self {
            kind: key.kind.clone(),
            key,
            fields: BTreeMap::new(),
        }
    }

    /// Create a new record with a builder pattern.
    pub fn builder(key: Key) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(key),
        }
    }

    /// Set a field value, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Get a field value by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Iterate over field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Get the number of fields (excluding the key).
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Builder for `Record`.
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a field to the record.
    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.record.set(name, value);
        self
    }

    /// Build the record.
    pub fn build(self) -> Record {
        self.record
    }
}
