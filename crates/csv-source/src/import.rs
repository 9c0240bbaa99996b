//! Batched import implementation
//!
//! This module reads delimited text files, decodes every line into a typed
//! record using the schema, and writes the records to an entity store in
//! fixed-size batches.

use anyhow::{Context, Result};
use csv_types::{tokenize, RecordDecoder, FILE_EXTENSION};
use entity_store::{EntityStore, Session};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sync_core::{Record, Schema};
use tracing::{debug, info, warn};

/// Default number of records written per `put`.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Separator between the kind and the suffix in file names.
pub const KIND_SUFFIX_SEPARATOR: char = '-';

/// Configuration for import
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Files to import, in order
    pub files: Vec<PathBuf>,

    /// Number of records to write in each batch
    pub batch_size: usize,

    /// Whether to decode everything without writing
    pub dry_run: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            files: vec![],
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

/// Result of an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    /// Files decoded, in order
    pub files_loaded: Vec<PathBuf>,
    /// Files skipped because their kind has no schema
    pub skipped_files: Vec<PathBuf>,
    /// Records decoded from all files
    pub records_read: u64,
    /// `put` calls issued
    pub batches_written: u64,
    /// Records handed to `put`
    pub records_written: u64,
    pub total_duration: Duration,
}

/// Derive the kind from a file name: the text before the first `-`.
pub fn kind_from_path(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    let (kind, _) = name.split_once(KIND_SUFFIX_SEPARATOR)?;
    (!kind.is_empty()).then_some(kind)
}

/// Expand directories into the data files they contain.
///
/// Plain file paths are kept as given. Directory entries are filtered to the
/// export file extension and sorted by name.
pub fn resolve_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {}", input.display()))?
            {
                let path = entry?.path();
                if path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION)
                {
                    found.push(path);
                }
            }
            found.sort();
            debug!("Found {} files in {}", found.len(), input.display());
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Import files into the store.
///
/// The batch buffer spans files: N decoded records result in exactly
/// `ceil(N / batch_size)` `put` calls. A file whose kind has no schema is
/// skipped with a warning; any decoding error aborts the import.
pub async fn import<S: EntityStore + ?Sized>(
    session: &Session<'_, S>,
    schema: &Schema,
    config: &ImportConfig,
) -> Result<ImportSummary> {
    let start_time = Instant::now();
    let batch_size = config.batch_size.max(1);
    info!("Starting import of {} files", config.files.len());
    info!("Batch size: {batch_size}");

    if config.dry_run {
        warn!("Running in dry-run mode - no data will be written");
    }

    let decoder = RecordDecoder::new();
    let mut summary = ImportSummary::default();
    let mut batch: Vec<Record> = Vec::with_capacity(batch_size);

    for path in &config.files {
        let Some(kind) = kind_from_path(path) else {
            warn!(
                "Skipping {} because no kind can be derived from its name",
                path.display()
            );
            summary.skipped_files.push(path.clone());
            continue;
        };
        let Some(resolved) = schema.resolve_kind(kind) else {
            warn!("Skipping {kind} because no schema is declared for it");
            summary.skipped_files.push(path.clone());
            continue;
        };

        info!("Loading {}", path.display());
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(line) => {
                tokenize(&line.with_context(|| format!("Failed to read {}", path.display()))?)
            }
            None => {
                warn!("{} is empty", path.display());
                summary.files_loaded.push(path.clone());
                continue;
            }
        };
        debug!("{kind} columns: {header:?}");

        let mut file_records = 0u64;
        for (index, line) in lines.enumerate() {
            let line_number = index + 2;
            let line = line
                .with_context(|| format!("Failed to read {}:{line_number}", path.display()))?;
            if line.is_empty() {
                continue;
            }

            let tokens = tokenize(&line);
            let record = decoder
                .decode(&header, &tokens, resolved)
                .with_context(|| format!("{}:{line_number}", path.display()))?;
            batch.push(record);
            file_records += 1;

            if batch.len() >= batch_size {
                flush(session, &mut batch, config, &mut summary).await?;
            }
        }

        summary.records_read += file_records;
        summary.files_loaded.push(path.clone());
        info!("Read {file_records} records from {}", path.display());
    }

    if !batch.is_empty() {
        flush(session, &mut batch, config, &mut summary).await?;
    }

    summary.total_duration = start_time.elapsed();
    info!(
        "Import complete: {} records in {} batches from {} files ({} skipped) in {:?}",
        summary.records_read,
        summary.batches_written,
        summary.files_loaded.len(),
        summary.skipped_files.len(),
        summary.total_duration
    );
    Ok(summary)
}

async fn flush<S: EntityStore + ?Sized>(
    session: &Session<'_, S>,
    batch: &mut Vec<Record>,
    config: &ImportConfig,
    summary: &mut ImportSummary,
) -> Result<()> {
    if config.dry_run {
        debug!("Dry run: Would insert batch of {} records", batch.len());
    } else {
        session
            .put(batch.as_slice())
            .await
            .with_context(|| format!("Failed to write batch of {} records", batch.len()))?;
        summary.batches_written += 1;
        summary.records_written += batch.len() as u64;
        debug!("Wrote batch of {} records", batch.len());
    }
    batch.clear();
    Ok(())
}
