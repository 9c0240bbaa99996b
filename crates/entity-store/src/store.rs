//! Entity store trait and paging types
//!
//! This module defines the EntityStore trait that the export and import
//! pumps are written against, plus the cursor and page types it returns.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sync_core::Record;

/// Opaque position within one kind's query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a store-defined cursor string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Cursor that resumes after `offset` records.
    pub fn from_offset(offset: usize) -> Self {
        Self(offset.to_string())
    }

    /// Read back a cursor created by [`Cursor::from_offset`].
    pub fn to_offset(&self) -> Result<usize> {
        self.0
            .parse()
            .with_context(|| format!("Invalid cursor '{}'", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in store iteration order
    pub records: Vec<Record>,
    /// Cursor for the following page, `None` when the kind is exhausted
    pub next: Option<Cursor>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trait for entity store operations.
///
/// This trait abstracts the store holding the records, allowing the same
/// export and import logic to work with:
/// - In-memory storage (`MemoryStore`)
/// - JSON-lines files in a directory (`DirectoryStore`)
///
/// Calls are only made through an open [`crate::Session`].
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Acquire whatever the store needs before the first call.
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Give back what [`EntityStore::open`] acquired.
    ///
    /// Called exactly once per successful open, including on error paths,
    /// so it cannot fail; problems are logged instead.
    fn release(&self) {}

    /// Names of all kinds currently holding records.
    async fn list_kinds(&self) -> Result<Vec<String>>;

    /// Fetch up to `limit` records of a kind, starting at `cursor`.
    async fn query_page(&self, kind: &str, cursor: Option<&Cursor>, limit: usize)
        -> Result<Page>;

    /// Write a batch of records, replacing any record with the same key.
    async fn put(&self, records: &[Record]) -> Result<()>;
}
