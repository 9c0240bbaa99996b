//! Delimited text import for datastore-sync
//!
//! This crate reads exported files (one kind per file, kind taken from the
//! file name) and writes the decoded records to an entity store in batches.

mod import;

pub use import::{
    import, kind_from_path, resolve_inputs, ImportConfig, ImportSummary, DEFAULT_BATCH_SIZE,
    KIND_SUFFIX_SEPARATOR,
};
