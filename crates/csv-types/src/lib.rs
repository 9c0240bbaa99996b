//! Delimited text codec for sync-core records.
//!
//! This crate converts between sync-core's `FieldValue` / `Record` and a
//! comma-separated text format with one file per kind.
//!
//! # Modules
//!
//! - [`forward`] - FieldValue → text (escaping, row joining)
//! - [`reverse`] - text → FieldValue (tokenizing, schema-typed decoding)
//! - [`record`] - whole records: header/row encoding and row decoding
//!
//! # Format
//!
//! ```text
//! __key__,title,tags,note
//! eyJraW5kIjoi...,"Desk, oak",a;b,NULL
//! ```
//!
//! - Separator `,`, quote `"`, doubled quote for a literal quote.
//! - Line breaks inside text are written as `__N__` and `__R__`.
//! - Collection elements are joined with `;`.
//! - `NULL` marks a null or missing value.
//!
//! # Example
//!
//! ```rust
//! use csv_types::{tokenize, Escaper};
//! use sync_core::{FieldValue, ScalarType};
//!
//! let escaper = Escaper::new();
//! let token = escaper.encode(&FieldValue::text("a, b"));
//! assert_eq!(token, "\"a, b\"");
//!
//! let tokens = tokenize(&token);
//! let value = escaper.decode(&tokens[0], &ScalarType::Text).unwrap();
//! assert_eq!(value, FieldValue::text("a, b"));
//! ```

pub mod error;
pub mod forward;
pub mod record;
pub mod reverse;

pub use error::CodecError;
pub use forward::{escape_text, write_row, Escaper};
pub use record::{element_type, PropertyNameUnion, RecordDecoder, RecordEncoder};
pub use reverse::{tokenize, unescape_text};

/// Field separator.
pub const SEPARATOR: char = ',';

/// Quote character.
pub const QUOTE: char = '"';

/// Separator between collection elements.
pub const COLLECTION_SEPARATOR: char = ';';

/// Literal written for null and missing values.
pub const NULL_MARKER: &str = "NULL";

/// Replacement for a newline inside text.
pub const NEWLINE_SENTINEL: &str = "__N__";

/// Replacement for a carriage return inside text.
pub const CARRIAGE_RETURN_SENTINEL: &str = "__R__";

/// Extension of exported files.
pub const FILE_EXTENSION: &str = "csv";
