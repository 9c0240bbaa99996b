//! Streaming export implementation
//!
//! This module pages through every kind in an entity store and writes each
//! kind to its own delimited text file.

use anyhow::{Context, Result};
use chrono::Utc;
use csv_types::{PropertyNameUnion, RecordEncoder, FILE_EXTENSION};
use entity_store::{Cursor, EntityStore, Session};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default number of records fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default number of records sampled to build the header.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Default buffer size for file writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Prefix of the directory created for each export run.
pub const DUMP_DIR_PREFIX: &str = "datastore-dump-";

/// Store-internal and metadata kinds that are never exported.
pub const INTERNAL_KINDS: &[&str] = &[
    "_ah_SESSION",
    "__Stat_Kind_CompositeIndex__",
    "__Stat_Kind_IsRootEntity__",
    "__Stat_Kind_NotRootEntity__",
    "__Stat_Kind__",
    "__Stat_PropertyName_Kind__",
    "__Stat_PropertyType_Kind__",
    "__Stat_PropertyType_PropertyName_Kind__",
    "__Stat_PropertyType__",
    "__Stat_Total__",
    "__BlobFileIndex__",
    "__BlobInfo__",
    "__Stat_Namespace__",
];

/// How the column set of a kind is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStrategy {
    /// Build the header from the first `n` records only.
    ///
    /// Fields that first appear after the sample are not exported.
    BoundedSample(usize),

    /// Page through the whole kind once to build the header, then again to
    /// write rows.
    FullPreScan,
}

impl Default for HeaderStrategy {
    fn default() -> Self {
        Self::BoundedSample(DEFAULT_SAMPLE_SIZE)
    }
}

/// Configuration for export
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory under which the dump directory is created
    pub output_dir: PathBuf,

    /// Column discovery strategy
    pub header_strategy: HeaderStrategy,

    /// Number of records fetched per page
    pub page_size: usize,

    /// Kinds skipped in addition to the internal kinds
    pub excluded_kinds: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            header_strategy: HeaderStrategy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            excluded_kinds: vec![],
        }
    }
}

impl ExportConfig {
    /// Check whether a kind is skipped.
    pub fn is_excluded(&self, kind: &str) -> bool {
        INTERNAL_KINDS.contains(&kind) || self.excluded_kinds.iter().any(|k| k == kind)
    }
}

/// One written file.
#[derive(Debug, Clone)]
pub struct ExportedKind {
    pub kind: String,
    pub path: PathBuf,
    pub rows_written: u64,
    pub columns: usize,
}

/// Result of an export run.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Directory holding the written files
    pub dump_dir: PathBuf,
    /// One entry per exported kind, in export order
    pub files: Vec<ExportedKind>,
    /// Kinds skipped because they are excluded
    pub skipped_kinds: Vec<String>,
    pub total_duration: Duration,
}

impl ExportSummary {
    /// Total rows written across all files.
    pub fn rows_written(&self) -> u64 {
        self.files.iter().map(|f| f.rows_written).sum()
    }

    /// Written file paths, in export order.
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

/// Statistics for one kind written by [`export_kind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub rows_written: u64,
    pub columns: usize,
}

/// Export every kind of the store into a fresh dump directory.
///
/// Each kind is written to `<kind>-<ulid>.csv`. Kinds with no records still
/// get a file holding only the header.
pub async fn export<S: EntityStore + ?Sized>(
    session: &Session<'_, S>,
    config: &ExportConfig,
) -> Result<ExportSummary> {
    let start_time = Instant::now();
    let dump_dir = config.output_dir.join(format!(
        "{DUMP_DIR_PREFIX}{}",
        Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
    ));
    fs::create_dir_all(&dump_dir)
        .with_context(|| format!("Failed to create dump directory {}", dump_dir.display()))?;

    info!("Starting export to {}", dump_dir.display());
    info!("Header strategy: {:?}", config.header_strategy);

    let kinds = session.list_kinds().await.context("Failed to list kinds")?;
    for kind in &kinds {
        info!("Kind: {kind}");
    }

    let mut summary = ExportSummary {
        dump_dir: dump_dir.clone(),
        ..Default::default()
    };

    for kind in kinds {
        if config.is_excluded(&kind) {
            debug!("Skipping excluded kind {kind}");
            summary.skipped_kinds.push(kind);
            continue;
        }
        if kind.contains('-') {
            warn!("Kind name '{kind}' contains '-', the exported file cannot be imported by name");
        }

        info!("Exporting {kind}");
        let path = dump_dir.join(format!("{kind}-{}.{FILE_EXTENSION}", ulid::Ulid::new()));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);

        let stats = export_kind(session, &kind, &mut writer, config)
            .await
            .with_context(|| format!("Failed to export kind '{kind}'"))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Wrote {} ({} rows)", path.display(), stats.rows_written);
        summary.files.push(ExportedKind {
            kind,
            path,
            rows_written: stats.rows_written,
            columns: stats.columns,
        });
    }

    summary.total_duration = start_time.elapsed();
    info!(
        "Export complete: {} kinds, {} rows in {:?}",
        summary.files.len(),
        summary.rows_written(),
        summary.total_duration
    );
    Ok(summary)
}

/// Write one kind (header and rows) to `writer`.
pub async fn export_kind<S, W>(
    session: &Session<'_, S>,
    kind: &str,
    writer: &mut W,
    config: &ExportConfig,
) -> Result<KindStats>
where
    S: EntityStore + ?Sized,
    W: Write,
{
    let encoder = RecordEncoder::new();
    let mut union = PropertyNameUnion::new();
    let mut stats = KindStats::default();
    let page_size = config.page_size.max(1);

    match config.header_strategy {
        HeaderStrategy::BoundedSample(sample_size) => {
            // The sample page seeds the header and is then written like any other page.
            let mut page = session
                .query_page(kind, None, sample_size.max(1))
                .await?;
            for record in &page.records {
                encoder.accumulate_field_names(record, &mut union);
            }
            writeln!(writer, "{}", encoder.encode_header(&union))?;
            debug!("{kind}: header has {} columns from sample", union.len());

            loop {
                for record in &page.records {
                    writeln!(writer, "{}", encoder.encode_row(record, &union))?;
                    stats.rows_written += 1;
                }
                match page.next.take() {
                    Some(cursor) if !page.is_empty() => {
                        page = session.query_page(kind, Some(&cursor), page_size).await?;
                        if page.is_empty() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
        }
        HeaderStrategy::FullPreScan => {
            let mut cursor: Option<Cursor> = None;
            loop {
                let page = session.query_page(kind, cursor.as_ref(), page_size).await?;
                for record in &page.records {
                    encoder.accumulate_field_names(record, &mut union);
                }
                match page.next {
                    Some(next) if !page.is_empty() => cursor = Some(next),
                    _ => break,
                }
            }
            writeln!(writer, "{}", encoder.encode_header(&union))?;
            debug!("{kind}: header has {} columns from full scan", union.len());

            let mut cursor: Option<Cursor> = None;
            loop {
                let page = session.query_page(kind, cursor.as_ref(), page_size).await?;
                for record in &page.records {
                    writeln!(writer, "{}", encoder.encode_row(record, &union))?;
                    stats.rows_written += 1;
                }
                match page.next {
                    Some(next) if !page.is_empty() => cursor = Some(next),
                    _ => break,
                }
            }
        }
    }

    stats.columns = union.len() + 1;
    Ok(stats)
}
