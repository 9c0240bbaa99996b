//! Record keys and the key codec.
//!
//! A [`Key`] identifies one record: its kind, its id within that kind and an
//! optional parent key (ancestor path). Keys travel through the text format
//! as opaque strings produced by a [`KeyCodec`]; the default
//! [`WebSafeKeyCodec`] emits URL-safe base64, which never contains the field
//! separator, the collection separator, quotes or line breaks.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for key decoding.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The encoded string is not valid base64
    #[error("Invalid key encoding '{value}': {source}")]
    Encoding {
        value: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded bytes are not a key
    #[error("Malformed key '{value}': {source}")]
    Malformed {
        value: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key has no kind
    #[error("Key has an empty kind")]
    EmptyKind,
}

/// Identifier of a record within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyId {
    /// Application-assigned name
    Name(String),
    /// Numeric id
    Id(i64),
}

/// Primary reference key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    /// Kind of the referenced record
    pub kind: String,

    /// Id within the kind
    pub id: KeyId,

    /// Ancestor key, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Key>>,
}

impl Key {
    /// Create a key with a string name.
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: KeyId::Name(name.into()),
            parent: None,
        }
    }

    /// Create a key with a numeric id.
    pub fn id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: KeyId::Id(id),
            parent: None,
        }
    }

    /// Attach a parent key.
    pub fn with_parent(mut self, parent: Key) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Get the parent key, if any.
    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        match &self.id {
            KeyId::Name(name) => write!(f, "{}(\"{}\")", self.kind, name),
            KeyId::Id(id) => write!(f, "{}({})", self.kind, id),
        }
    }
}

/// Bijective conversion between keys and their text form.
///
/// Implementations must satisfy `decode(encode(k)) == k` and must never
/// produce `,`, `;`, `"`, `\n` or `\r`.
pub trait KeyCodec: Send + Sync {
    /// Encode a key as an opaque string.
    fn encode(&self, key: &Key) -> String;

    /// Decode a string produced by [`KeyCodec::encode`].
    fn decode(&self, value: &str) -> Result<Key, KeyError>;
}

/// Default key codec: URL-safe base64 (no padding) over the JSON form of the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSafeKeyCodec;

impl KeyCodec for WebSafeKeyCodec {
    fn encode(&self, key: &Key) -> String {
        // Serializing a Key (strings, integers and nested keys) cannot fail.
        let json = serde_json::to_vec(key).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    fn decode(&self, value: &str) -> Result<Key, KeyError> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|source| KeyError::Encoding {
                value: value.to_string(),
                source,
            })?;
        let key: Key = serde_json::from_slice(&bytes).map_err(|source| KeyError::Malformed {
            value: value.to_string(),
            source,
        })?;
        if key.kind.is_empty() {
            return Err(KeyError::EmptyKind);
        }
        Ok(key)
    }
}
