//! Declared field types.
//!
//! This module defines `ScalarType` and `FieldType`, the closed set of types a
//! schema can declare for a record field. The codec matches on these
//! exhaustively, so adding a new scalar type is a compile-checked change.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Type of a single (non-collection) value.
///
/// # YAML Format
///
/// Simple types can be specified as strings:
/// ```yaml
/// type: text
/// type: int64
/// type: timestamp
/// ```
///
/// Enumerations use object format:
/// ```yaml
/// type:
///   type: enum
///   values: [OPEN, CLOSED]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    /// Short text value
    Text,

    /// Opaque long text blob, escaped exactly like `Text`
    LongText,

    /// 64-bit signed integer
    Int64,

    /// 32-bit signed integer
    Int32,

    /// 64-bit IEEE 754 floating point
    Float64,

    /// Boolean value
    Bool,

    /// Point in time as epoch milliseconds
    Timestamp,

    /// Foreign-key reference to another record
    Reference,

    /// Enumeration type
    Enum {
        /// Allowed symbolic names (empty accepts any name)
        values: Vec<String>,
    },
}

/// Collection flavour declared on a multi-valued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Ordered sequence
    List,
    /// Unordered set (element order is kept as stored)
    Set,
}

impl CollectionKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Set => "set",
        }
    }
}

/// Declared type of a record field.
///
/// A collection carries its declared type parameters as written in the
/// schema. Exactly one parameter is expected; the decoder rejects anything
/// else as a configuration error instead of guessing.
///
/// ```yaml
/// type:
///   type: list
///   of: [int64]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Single scalar value
    Scalar(ScalarType),

    /// Multi-valued field
    Collection {
        /// List or set
        kind: CollectionKind,
        /// Declared type parameters
        type_args: Vec<ScalarType>,
    },
}

impl ScalarType {
    /// Create a new Enum type with the given values.
    pub fn enumeration(values: Vec<String>) -> Self {
        Self::Enum { values }
    }

    /// Name used in schema files.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::LongText => "long_text",
            Self::Int64 => "int64",
            Self::Int32 => "int32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Reference => "reference",
            Self::Enum { .. } => "enum",
        }
    }
}

impl FieldType {
    /// Create a list type with a single element type.
    pub fn list(element: ScalarType) -> Self {
        Self::Collection {
            kind: CollectionKind::List,
            type_args: vec![element],
        }
    }

    /// Create a set type with a single element type.
    pub fn set(element: ScalarType) -> Self {
        Self::Collection {
            kind: CollectionKind::Set,
            type_args: vec![element],
        }
    }

    /// Check if this type is multi-valued.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection { .. })
    }
}

impl From<ScalarType> for FieldType {
    fn from(scalar: ScalarType) -> Self {
        Self::Scalar(scalar)
    }
}

// Custom serialization: simple types as strings ("text"), complex types as
// maps ({"type": "enum", "values": [...]}).

impl Serialize for ScalarType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Enum { values } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("values", values)?;
                map.end()
            }
            other => serializer.serialize_str(other.type_name()),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Collection { kind, type_args } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", kind.as_str())?;
                map.serialize_entry("of", type_args)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, Visitor};

        struct FieldTypeVisitor;

        impl<'de> Visitor<'de> for FieldTypeVisitor {
            type Value = FieldType;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or map representing a field type")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                simple_scalar(value)
                    .map(FieldType::Scalar)
                    .ok_or_else(|| E::custom(format!("unknown simple type: {value}")))
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut type_name: Option<String> = None;
                let mut fields: HashMap<String, serde_yaml::Value> = HashMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == "type" {
                        type_name = Some(map.next_value()?);
                    } else {
                        fields.insert(key, map.next_value()?);
                    }
                }

                let type_name = type_name.ok_or_else(|| M::Error::missing_field("type"))?;

                if let Some(scalar) = simple_scalar(&type_name) {
                    return Ok(FieldType::Scalar(scalar));
                }

                match type_name.as_str() {
                    "enum" => {
                        let values: Vec<String> = get_field(&fields, "values")
                            .map_err(M::Error::custom)?
                            .unwrap_or_default();
                        Ok(FieldType::Scalar(ScalarType::Enum { values }))
                    }
                    "list" | "set" => {
                        let kind = if type_name == "list" {
                            CollectionKind::List
                        } else {
                            CollectionKind::Set
                        };
                        // Missing parameters are kept empty and rejected when decoding.
                        let type_args: Vec<ScalarType> = get_field(&fields, "of")
                            .map_err(M::Error::custom)?
                            .unwrap_or_default();
                        Ok(FieldType::Collection { kind, type_args })
                    }
                    _ => Err(M::Error::custom(format!("unknown type: {type_name}"))),
                }
            }
        }

        deserializer.deserialize_any(FieldTypeVisitor)
    }
}

impl<'de> Deserialize<'de> for ScalarType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        match FieldType::deserialize(deserializer)? {
            FieldType::Scalar(scalar) => Ok(scalar),
            FieldType::Collection { .. } => Err(D::Error::custom(
                "collection types cannot be used as collection elements",
            )),
        }
    }
}

fn simple_scalar(value: &str) -> Option<ScalarType> {
    match value {
        "text" | "string" => Some(ScalarType::Text),
        "long_text" | "longtext" => Some(ScalarType::LongText),
        "int64" | "long" => Some(ScalarType::Int64),
        "int32" | "int" => Some(ScalarType::Int32),
        "float64" | "double" => Some(ScalarType::Float64),
        "bool" | "boolean" => Some(ScalarType::Bool),
        "timestamp" | "date" => Some(ScalarType::Timestamp),
        "reference" | "key" => Some(ScalarType::Reference),
        _ => None,
    }
}

/// Read an optional parameter. A present but malformed value is an error.
fn get_field<T: for<'de> Deserialize<'de>>(
    fields: &HashMap<String, serde_yaml::Value>,
    key: &str,
) -> Result<Option<T>, String> {
    fields
        .get(key)
        .map(|v| serde_yaml::from_value(v.clone()))
        .transpose()
        .map_err(|e| format!("invalid field '{key}': {e}"))
}
