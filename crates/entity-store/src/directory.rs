//! Directory-based entity store implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use sync_core::{FieldValue, Key, Record};
use tracing::{debug, warn};

use crate::store::{Cursor, EntityStore, Page};

const LOCK_FILE: &str = ".lock";
const RECORD_EXTENSION: &str = "jsonl";

/// Directory implementation of the EntityStore trait.
///
/// Stores each kind as a JSON-lines file (`<kind>.jsonl`, one record per
/// line) in a directory. Opening the store creates a lock file so that two
/// runs never share a directory; releasing removes it.
///
/// Paging streams the file, so queries hold one page in memory. A `put`
/// rewrites each touched kind file in full.
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Create a new DirectoryStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn kind_path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{kind}.{RECORD_EXTENSION}"))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }
}

/// Kind names become file names, so they must stay inside the store directory.
fn check_kind_name(kind: &str) -> Result<()> {
    if kind.is_empty() || kind.starts_with('.') || kind.contains(['/', '\\']) {
        anyhow::bail!("Kind name {kind:?} cannot be stored as a file name");
    }
    Ok(())
}

/// JSON has no representation for NaN or infinities; such a value would be
/// written as `null` and make the kind file unreadable.
fn check_finite(record: &Record) -> Result<()> {
    fn finite(value: &FieldValue) -> bool {
        match value {
            FieldValue::Float64(f) => f.is_finite(),
            FieldValue::Collection(elements) => elements.iter().all(finite),
            _ => true,
        }
    }

    for (name, value) in &record.fields {
        if !finite(value) {
            anyhow::bail!(
                "Record {} has a non-finite float in field '{name}'",
                record.key
            );
        }
    }
    Ok(())
}

fn read_all(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), index + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn write_all(path: &Path, records: &[Record]) -> Result<()> {
    let tmp = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl EntityStore for DirectoryStore {
    async fn open(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory {}", self.dir.display()))?;

        let lock = self.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&lock) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                debug!("Acquired store lock {}", lock.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => anyhow::bail!(
                "Store directory {} is in use by another run (remove {} if it is stale)",
                self.dir.display(),
                lock.display()
            ),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to create lock file {}", lock.display()))
            }
        }
    }

    fn release(&self) {
        let lock = self.lock_path();
        if let Err(e) = fs::remove_file(&lock) {
            warn!("Failed to remove store lock {}: {e}", lock.display());
        }
    }

    async fn list_kinds(&self) -> Result<Vec<String>> {
        let mut kinds = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    kinds.push(stem.to_string());
                }
            }
        }
        kinds.sort();
        Ok(kinds)
    }

    async fn query_page(
        &self,
        kind: &str,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page> {
        check_kind_name(kind)?;
        let offset = cursor.map(Cursor::to_offset).transpose()?.unwrap_or(0);
        let path = self.kind_path(kind);
        if !path.exists() {
            return Ok(Page::default());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::with_capacity(limit);
        for (index, line) in reader
            .lines()
            .enumerate()
            .filter(|(_, line)| !matches!(line, Ok(l) if l.trim().is_empty()))
            .skip(offset)
            .take(limit)
        {
            let line = line?;
            let record = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: invalid record", path.display(), index + 1))?;
            records.push(record);
        }

        let next = if !records.is_empty() && records.len() == limit {
            Some(Cursor::from_offset(offset + records.len()))
        } else {
            None
        };
        Ok(Page { records, next })
    }

    async fn put(&self, records: &[Record]) -> Result<()> {
        let mut by_kind: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
        for record in records {
            check_kind_name(&record.kind)?;
            check_finite(record)?;
            by_kind.entry(record.kind.as_str()).or_default().push(record);
        }

        for (kind, batch) in by_kind {
            let path = self.kind_path(kind);
            let mut existing = read_all(&path)?;
            let mut positions: HashMap<Key, usize> = existing
                .iter()
                .enumerate()
                .map(|(i, r)| (r.key.clone(), i))
                .collect();

            for record in batch {
                match positions.get(&record.key) {
                    Some(&i) => existing[i] = record.clone(),
                    None => {
                        positions.insert(record.key.clone(), existing.len());
                        existing.push(record.clone());
                    }
                }
            }

            write_all(&path, &existing)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Wrote {} records to {}", existing.len(), path.display());
        }
        Ok(())
    }
}
