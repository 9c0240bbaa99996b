//! Delimited text export for datastore-sync
//!
//! This crate pages through an entity store and writes one file per kind.
//! Column order is fixed by a header built either from a bounded sample of
//! each kind or from a full pre-scan (see [`HeaderStrategy`]).

mod export;

pub use export::{
    export, export_kind, ExportConfig, ExportSummary, ExportedKind, HeaderStrategy, KindStats,
    DEFAULT_BUFFER_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_SAMPLE_SIZE, DUMP_DIR_PREFIX, INTERNAL_KINDS,
};
