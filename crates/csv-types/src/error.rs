//! Codec error type.

use sync_core::{KeyError, SchemaError};

/// Error type for decoding delimited text into records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Token is not a valid number for the declared type
    #[error("Failed to parse '{value}' as {expected}")]
    NumericParseFailure {
        value: String,
        expected: &'static str,
    },

    /// Token is not exactly `true` or `false`
    #[error("Failed to parse '{value}' as bool: expected 'true' or 'false'")]
    BooleanParseFailure { value: String },

    /// Token is not a valid encoded key
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Enum name not among the declared values
    #[error("Unknown enum value '{value}', expected one of {allowed:?}")]
    UnknownEnumVariant { value: String, allowed: Vec<String> },

    /// Header and row have different column counts
    #[error("Row has {tokens} columns but header has {header}")]
    RowShapeMismatch { header: usize, tokens: usize },

    /// Header does not contain the key column
    #[error("Header has no '{0}' column")]
    MissingKeyColumn(&'static str),

    /// Collection field declared without exactly one element type
    #[error("Collection field '{field}' must declare exactly one element type, found {count}")]
    BadTypeParameters { field: String, count: usize },

    /// Column not resolvable through the schema
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl CodecError {
    pub(crate) fn numeric(value: &str, expected: &'static str) -> Self {
        Self::NumericParseFailure {
            value: value.to_string(),
            expected,
        }
    }
}
