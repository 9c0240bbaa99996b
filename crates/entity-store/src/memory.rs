//! In-memory entity store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use sync_core::{Key, Record};
use tokio::sync::Mutex;

use crate::store::{Cursor, EntityStore, Page};

/// In-memory implementation of the EntityStore trait.
///
/// Records of a kind are iterated in key order. Every `put` call is
/// recorded, along with session open/release counts, so callers can check
/// how a pump used the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    kinds: Mutex<BTreeMap<String, BTreeMap<Key, Record>>>,
    put_sizes: Mutex<Vec<usize>>,
    opens: AtomicUsize,
    releases: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with records. Not counted as a `put`.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut kinds: BTreeMap<String, BTreeMap<Key, Record>> = BTreeMap::new();
        for record in records {
            kinds
                .entry(record.kind.clone())
                .or_default()
                .insert(record.key.clone(), record);
        }
        Self {
            kinds: Mutex::new(kinds),
            ..Self::default()
        }
    }

    /// All records of a kind, in iteration order.
    pub async fn records(&self, kind: &str) -> Vec<Record> {
        self.kinds
            .lock()
            .await
            .get(kind)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Sizes of every `put` batch received, in call order.
    pub async fn put_sizes(&self) -> Vec<usize> {
        self.put_sizes.lock().await.clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn open(&self) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    async fn list_kinds(&self) -> Result<Vec<String>> {
        Ok(self.kinds.lock().await.keys().cloned().collect())
    }

    async fn query_page(
        &self,
        kind: &str,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page> {
        let offset = cursor.map(Cursor::to_offset).transpose()?.unwrap_or(0);
        let kinds = self.kinds.lock().await;

        let records: Vec<Record> = kinds
            .get(kind)
            .map(|records| records.values().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default();

        let next = if !records.is_empty() && records.len() == limit {
            Some(Cursor::from_offset(offset + records.len()))
        } else {
            None
        };
        Ok(Page { records, next })
    }

    async fn put(&self, records: &[Record]) -> Result<()> {
        let mut kinds = self.kinds.lock().await;
        for record in records {
            kinds
                .entry(record.kind.clone())
                .or_default()
                .insert(record.key.clone(), record.clone());
        }
        self.put_sizes.lock().await.push(records.len());
        Ok(())
    }
}
