//! Reverse conversion: delimited text → FieldValue.
//!
//! [`tokenize`] splits a line into raw tokens and undoes quoting.
//! [`Escaper::decode`] coerces one token into a value of the declared type.

use crate::error::CodecError;
use crate::forward::Escaper;
use crate::{
    CARRIAGE_RETURN_SENTINEL, COLLECTION_SEPARATOR, NEWLINE_SENTINEL, NULL_MARKER, QUOTE,
    SEPARATOR,
};
use sync_core::{FieldValue, KeyCodec, ScalarType};

/// Split one line into column tokens.
///
/// A single scan with one character of lookahead. Quotes open and close
/// quoted regions and are not part of the token; a doubled quote inside a
/// quoted region is a literal quote. An empty line yields one empty token.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            SEPARATOR if !in_quotes => tokens.push(std::mem::take(&mut current)),
            QUOTE if !in_quotes => in_quotes = true,
            QUOTE => {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            _ => current.push(c),
        }
    }
    tokens.push(current);
    tokens
}

/// Reverse the line-break sentinels of an escaped text value.
pub fn unescape_text(value: &str) -> String {
    value
        .replace(NEWLINE_SENTINEL, "\n")
        .replace(CARRIAGE_RETURN_SENTINEL, "\r")
}

impl<C: KeyCodec> Escaper<C> {
    /// Decode one token as a scalar of the declared type.
    ///
    /// The null marker decodes to `Null` whatever the type. Enum names are
    /// returned as-is; checking them against the declared values is up to
    /// the caller.
    pub fn decode(&self, token: &str, ty: &ScalarType) -> Result<FieldValue, CodecError> {
        if token == NULL_MARKER {
            return Ok(FieldValue::Null);
        }

        match ty {
            ScalarType::Text => Ok(FieldValue::Text(unescape_text(token))),
            ScalarType::LongText => Ok(FieldValue::LongText(unescape_text(token))),
            ScalarType::Int64 => token
                .parse::<i64>()
                .map(FieldValue::Int64)
                .map_err(|_| CodecError::numeric(token, "int64")),
            ScalarType::Int32 => token
                .parse::<i32>()
                .map(FieldValue::Int32)
                .map_err(|_| CodecError::numeric(token, "int32")),
            ScalarType::Float64 => token
                .parse::<f64>()
                .map(FieldValue::Float64)
                .map_err(|_| CodecError::numeric(token, "float64")),
            ScalarType::Timestamp => token
                .parse::<i64>()
                .map(FieldValue::Timestamp)
                .map_err(|_| CodecError::numeric(token, "timestamp")),
            ScalarType::Bool => match token {
                "true" => Ok(FieldValue::Bool(true)),
                "false" => Ok(FieldValue::Bool(false)),
                _ => Err(CodecError::BooleanParseFailure {
                    value: token.to_string(),
                }),
            },
            ScalarType::Reference => Ok(FieldValue::Reference(self.codec().decode(token)?)),
            ScalarType::Enum { .. } => Ok(FieldValue::Enum(token.to_string())),
        }
    }

    /// Decode one token as a collection of the given element type.
    ///
    /// An empty token is an empty collection.
    pub fn decode_collection(
        &self,
        token: &str,
        element: &ScalarType,
    ) -> Result<FieldValue, CodecError> {
        if token == NULL_MARKER {
            return Ok(FieldValue::Null);
        }
        if token.is_empty() {
            return Ok(FieldValue::Collection(Vec::new()));
        }

        let elements = token
            .split(COLLECTION_SEPARATOR)
            .map(|piece| self.decode(piece, element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldValue::Collection(elements))
    }
}
