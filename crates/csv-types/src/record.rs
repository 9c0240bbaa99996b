//! Record-level encoding and decoding.
//!
//! [`RecordEncoder`] turns records into a header line and data lines using a
//! [`PropertyNameUnion`] for column order. [`RecordDecoder`] turns a header
//! and a tokenized line back into a typed [`Record`] using the schema.

use crate::error::CodecError;
use crate::forward::{write_row, Escaper};
use crate::NULL_MARKER;
use std::collections::HashSet;
use sync_core::{
    FieldDescriptor, FieldType, FieldValue, KeyCodec, Record, ResolvedKind, ScalarType,
    WebSafeKeyCodec, KEY_COLUMN,
};

/// Insertion-ordered set of field names seen on records of one kind.
///
/// Iteration order is the order names were first inserted, so the header and
/// every row built from the same union agree on column order.
#[derive(Debug, Clone, Default)]
pub struct PropertyNameUnion {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl PropertyNameUnion {
    /// Create an empty union.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name. Returns `true` if it was not present yet.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }

    /// Check whether a name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Encodes records as header and data lines.
#[derive(Debug, Clone, Default)]
pub struct RecordEncoder<C = WebSafeKeyCodec> {
    escaper: Escaper<C>,
}

impl RecordEncoder {
    /// Create an encoder using the web-safe key codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: KeyCodec> RecordEncoder<C> {
    /// Create an encoder around an existing escaper.
    pub fn with_escaper(escaper: Escaper<C>) -> Self {
        Self { escaper }
    }

    /// Add every field name present on the record to the union.
    pub fn accumulate_field_names(&self, record: &Record, union: &mut PropertyNameUnion) {
        for name in record.field_names() {
            union.insert(name);
        }
    }

    /// Header line: the key column followed by the union's names.
    pub fn encode_header(&self, union: &PropertyNameUnion) -> String {
        write_row(std::iter::once(KEY_COLUMN).chain(union.names().iter().map(String::as_str)))
    }

    /// Data line: the encoded key followed by one value per union name.
    ///
    /// Fields missing from the record are written as the null marker. Fields
    /// the record has but the union lacks are not written.
    pub fn encode_row(&self, record: &Record, union: &PropertyNameUnion) -> String {
        let key = self.escaper.encode_key(&record.key);
        let values = union.names().iter().map(|name| match record.get_field(name) {
            Some(value) => self.escaper.encode(value),
            None => NULL_MARKER.to_string(),
        });
        write_row(std::iter::once(key).chain(values))
    }
}

/// Decodes tokenized lines into typed records.
#[derive(Debug, Clone, Default)]
pub struct RecordDecoder<C = WebSafeKeyCodec> {
    escaper: Escaper<C>,
}

impl RecordDecoder {
    /// Create a decoder using the web-safe key codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: KeyCodec> RecordDecoder<C> {
    /// Create a decoder around an existing escaper.
    pub fn with_escaper(escaper: Escaper<C>) -> Self {
        Self { escaper }
    }

    /// Decode one row.
    ///
    /// The key column is decoded first and initializes the record; every
    /// other column is coerced through the field's declared type.
    pub fn decode(
        &self,
        header: &[String],
        tokens: &[String],
        kind: &ResolvedKind,
    ) -> Result<Record, CodecError> {
        if header.len() != tokens.len() {
            return Err(CodecError::RowShapeMismatch {
                header: header.len(),
                tokens: tokens.len(),
            });
        }

        let key_index = header
            .iter()
            .position(|name| name == KEY_COLUMN)
            .ok_or(CodecError::MissingKeyColumn(KEY_COLUMN))?;
        let key = self.escaper.codec().decode(&tokens[key_index])?;
        let mut record = Record::new(key);

        for (index, (name, token)) in header.iter().zip(tokens).enumerate() {
            if index == key_index {
                continue;
            }
            let value = if token == NULL_MARKER {
                FieldValue::Null
            } else {
                self.decode_field(name, token, kind.field(name)?)?
            };
            record.set(name.as_str(), value);
        }

        Ok(record)
    }

    fn decode_field(
        &self,
        name: &str,
        token: &str,
        descriptor: &FieldDescriptor,
    ) -> Result<FieldValue, CodecError> {
        match &descriptor.field_type {
            FieldType::Scalar(ty) => {
                let value = self.escaper.decode(token, ty)?;
                check_enum(value, ty)
            }
            FieldType::Collection { .. } => {
                let element = element_type(name, descriptor)?;
                let value = self.escaper.decode_collection(token, &element)?;
                match value {
                    FieldValue::Collection(elements) => elements
                        .into_iter()
                        .map(|e| check_enum(e, &element))
                        .collect::<Result<Vec<_>, _>>()
                        .map(FieldValue::Collection),
                    other => Ok(other),
                }
            }
        }
    }
}

/// Element type of a collection field.
///
/// Owned collections always hold references. Any other collection must
/// declare exactly one type parameter.
pub fn element_type(name: &str, descriptor: &FieldDescriptor) -> Result<ScalarType, CodecError> {
    if descriptor.owned {
        return Ok(ScalarType::Reference);
    }
    match &descriptor.field_type {
        FieldType::Collection { type_args, .. } if type_args.len() == 1 => Ok(type_args[0].clone()),
        FieldType::Collection { type_args, .. } => Err(CodecError::BadTypeParameters {
            field: name.to_string(),
            count: type_args.len(),
        }),
        FieldType::Scalar(_) => Err(CodecError::BadTypeParameters {
            field: name.to_string(),
            count: 0,
        }),
    }
}

/// Re-resolve a decoded enum name against the declared values.
fn check_enum(value: FieldValue, ty: &ScalarType) -> Result<FieldValue, CodecError> {
    match (&value, ty) {
        (FieldValue::Enum(name), ScalarType::Enum { values })
            if !values.is_empty() && !values.contains(name) =>
        {
            Err(CodecError::UnknownEnumVariant {
                value: name.clone(),
                allowed: values.clone(),
            })
        }
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reverse::tokenize;
    use sync_core::{Key, Schema, SchemaError};

    const SCHEMA: &str = r#"
kinds:
  - name: Order
    embedded: [Address]
    fields:
      - name: title
        type: text
      - name: qty
        type: int32
      - name: paid
        type: bool
      - name: tags
        type:
          type: set
          of: [text]
      - name: lines
        type:
          type: list
          of: [reference]
        owned: true
      - name: status
        type:
          type: enum
          values: [OPEN, CLOSED]
      - name: untyped
        type:
          type: list
  - name: Address
    embeddable: true
    fields:
      - name: city
        type: text
"#;

    fn schema() -> Schema {
        Schema::from_yaml(SCHEMA).unwrap()
    }

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample_record() -> Record {
        Record::builder(Key::name("Order", "o-1"))
            .field("title", FieldValue::text("Desk, oak"))
            .field("qty", FieldValue::Int32(2))
            .field("paid", FieldValue::Bool(true))
            .field(
                "tags",
                FieldValue::Collection(vec![FieldValue::text("a"), FieldValue::text("b")]),
            )
            .field(
                "lines",
                FieldValue::Collection(vec![
                    FieldValue::Reference(Key::id("Line", 1)),
                    FieldValue::Reference(Key::id("Line", 2)),
                ]),
            )
            .field("status", FieldValue::Enum("OPEN".into()))
            .field("city", FieldValue::text("Oslo"))
            .build()
    }

    #[test]
    fn test_union_keeps_first_insertion_order() {
        let mut union = PropertyNameUnion::new();
        assert!(union.insert("b"));
        assert!(union.insert("a"));
        assert!(!union.insert("b"));
        assert_eq!(union.names(), &["b", "a"]);
        assert_eq!(union.len(), 2);
        assert!(union.contains("a"));
    }

    #[test]
    fn test_header_always_starts_with_key_column() {
        let encoder = RecordEncoder::new();
        assert_eq!(encoder.encode_header(&PropertyNameUnion::new()), "__key__");

        let mut union = PropertyNameUnion::new();
        union.insert("title");
        union.insert("qty");
        assert_eq!(encoder.encode_header(&union), "__key__,title,qty");
    }

    #[test]
    fn test_missing_fields_encode_as_null() {
        let encoder = RecordEncoder::new();
        let mut union = PropertyNameUnion::new();
        union.insert("title");
        union.insert("qty");

        let record = Record::builder(Key::id("Order", 5))
            .field("qty", FieldValue::Int32(1))
            .build();
        let tokens = tokenize(&encoder.encode_row(&record, &union));
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], "NULL");
        assert_eq!(tokens[2], "1");
    }

    #[test]
    fn test_record_roundtrip() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let encoder = RecordEncoder::new();
        let decoder = RecordDecoder::new();

        let record = sample_record();
        let mut union = PropertyNameUnion::new();
        encoder.accumulate_field_names(&record, &mut union);

        let header = tokenize(&encoder.encode_header(&union));
        let tokens = tokenize(&encoder.encode_row(&record, &union));
        assert_eq!(header.len(), tokens.len());

        let decoded = decoder.decode(&header, &tokens, kind).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_key_column_may_appear_anywhere() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let escaper = Escaper::new();
        let key = Key::id("Order", 10);

        let decoded = RecordDecoder::new()
            .decode(
                &header(&["qty", "__key__"]),
                &["4".to_string(), escaper.encode_key(&key)],
                kind,
            )
            .unwrap();
        assert_eq!(decoded.key, key);
        assert_eq!(decoded.get_field("qty"), Some(&FieldValue::Int32(4)));
    }

    #[test]
    fn test_null_token_skips_type_checks() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let key = Escaper::new().encode_key(&Key::id("Order", 1));

        let decoded = RecordDecoder::new()
            .decode(
                &header(&["__key__", "qty", "untyped"]),
                &[key, "NULL".to_string(), "NULL".to_string()],
                kind,
            )
            .unwrap();
        assert_eq!(decoded.get_field("qty"), Some(&FieldValue::Null));
        assert_eq!(decoded.get_field("untyped"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_row_shape_mismatch() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let result = RecordDecoder::new().decode(
            &header(&["__key__", "qty"]),
            &["x".to_string()],
            kind,
        );
        assert!(matches!(
            result,
            Err(CodecError::RowShapeMismatch {
                header: 2,
                tokens: 1
            })
        ));
    }

    #[test]
    fn test_missing_key_column() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let result =
            RecordDecoder::new().decode(&header(&["qty"]), &["1".to_string()], kind);
        assert!(matches!(result, Err(CodecError::MissingKeyColumn(_))));
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let key = Escaper::new().encode_key(&Key::id("Order", 1));
        let result = RecordDecoder::new().decode(
            &header(&["__key__", "colour"]),
            &[key, "red".to_string()],
            kind,
        );
        assert!(matches!(
            result,
            Err(CodecError::Schema(SchemaError::UnknownField { .. }))
        ));
    }

    #[test]
    fn test_collection_without_single_type_parameter() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let key = Escaper::new().encode_key(&Key::id("Order", 1));
        let result = RecordDecoder::new().decode(
            &header(&["__key__", "untyped"]),
            &[key, "1;2".to_string()],
            kind,
        );
        assert!(matches!(
            result,
            Err(CodecError::BadTypeParameters { count: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_enum_variant() {
        let schema = schema();
        let kind = schema.resolve_kind("Order").unwrap();
        let key = Escaper::new().encode_key(&Key::id("Order", 1));
        let result = RecordDecoder::new().decode(
            &header(&["__key__", "status"]),
            &[key, "SHIPPED".to_string()],
            kind,
        );
        assert!(matches!(
            result,
            Err(CodecError::UnknownEnumVariant { .. })
        ));
    }

    #[test]
    fn test_owned_collection_decodes_references() {
        let descriptor = FieldDescriptor {
            field_type: FieldType::list(ScalarType::Int64),
            owned: true,
            declared_in: "Order".to_string(),
        };
        assert_eq!(
            element_type("lines", &descriptor).unwrap(),
            ScalarType::Reference
        );
    }
}
