//! Forward conversion: FieldValue → delimited text.
//!
//! Encoding never fails. Text values are escaped so that the tokenizer in
//! [`crate::reverse`] recovers them byte for byte, apart from the line-break
//! sentinels which are reversed by [`crate::reverse::unescape_text`].

use crate::{
    CARRIAGE_RETURN_SENTINEL, COLLECTION_SEPARATOR, NEWLINE_SENTINEL, NULL_MARKER, QUOTE,
    SEPARATOR,
};
use sync_core::{FieldValue, Key, KeyCodec, WebSafeKeyCodec};

/// Value transcoder for one field value of a known type.
///
/// The key codec is used for references and for the key column; every other
/// value is encoded without external help.
#[derive(Debug, Clone, Default)]
pub struct Escaper<C = WebSafeKeyCodec> {
    codec: C,
}

impl Escaper {
    /// Create an escaper using the web-safe key codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: KeyCodec> Escaper<C> {
    /// Create an escaper using a custom key codec.
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    /// The key codec in use.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Encode a key as its opaque text form.
    pub fn encode_key(&self, key: &Key) -> String {
        self.codec.encode(key)
    }

    /// Encode one field value as a ready-to-join column token.
    pub fn encode(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => NULL_MARKER.to_string(),
            FieldValue::Text(s) | FieldValue::LongText(s) => escape_text(s),
            FieldValue::Int64(i) | FieldValue::Timestamp(i) => i.to_string(),
            FieldValue::Int32(i) => i.to_string(),
            FieldValue::Float64(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Reference(key) => self.codec.encode(key),
            FieldValue::Enum(name) => name.clone(),
            // Each element is quoted on its own before joining.
            FieldValue::Collection(elements) => elements
                .iter()
                .map(|e| self.encode(e))
                .collect::<Vec<_>>()
                .join(&COLLECTION_SEPARATOR.to_string()),
        }
    }
}

/// Escape a text value.
///
/// Quotes are doubled, line breaks become sentinels, and the result is
/// wrapped in quotes when it contains the separator or a quote.
pub fn escape_text(value: &str) -> String {
    let escaped = value
        .replace(QUOTE, "\"\"")
        .replace('\n', NEWLINE_SENTINEL)
        .replace('\r', CARRIAGE_RETURN_SENTINEL);

    if escaped.contains(SEPARATOR) || escaped.contains(QUOTE) {
        format!("{QUOTE}{escaped}{QUOTE}")
    } else {
        escaped
    }
}

/// Join already-escaped column tokens into one line.
pub fn write_row<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            line.push(SEPARATOR);
        }
        line.push_str(value.as_ref());
    }
    line
}
