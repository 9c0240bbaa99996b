//! Core types for the datastore-sync framework.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ScalarType`] / [`FieldType`] - Declared field types
//! - [`FieldValue`] - Values a record field can hold
//! - [`Record`] - One keyed instance of a kind
//! - [`Key`] / [`KeyCodec`] - Record keys and their text form
//! - [`Schema`] - Kind and field declarations loaded from YAML
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── csv-types     (text codec: FieldValue <-> delimited text)
//!    ├─── entity-store  (store boundary: pages of Records, batched puts)
//!    ├─── csv-sink      (store -> CSV export)
//!    └─── csv-source    (CSV -> store import)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{FieldValue, Key, Record};
//!
//! let record = Record::builder(Key::id("Order", 1))
//!     .field("title", FieldValue::text("Desk"))
//!     .build();
//! assert_eq!(record.kind, "Order");
//! ```

pub mod key;
pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use key::{Key, KeyCodec, KeyError, KeyId, WebSafeKeyCodec};
pub use schema::{
    FieldDefinition, FieldDescriptor, KindDefinition, ResolvedKind, Schema, SchemaError,
};
pub use types::{CollectionKind, FieldType, ScalarType};
pub use values::{FieldValue, Record, RecordBuilder, ValueError};

/// Name of the reserved key column in exported files.
pub const KEY_COLUMN: &str = "__key__";
