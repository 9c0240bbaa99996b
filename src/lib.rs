//! DatastoreSync Library
//!
//! A library for moving the records of an entity store to delimited text
//! files and back.
//!
//! # Features
//!
//! - Export: one file per kind, header built from a sample or a full scan
//! - Import: schema-driven decoding with batched writes
//! - Migrate: export from one store and import the files into another
//!
//! # Crates
//!
//! - `sync_core` - Records, values, keys and the YAML schema
//! - `csv_types` - The text codec (escaping, tokenizing, record decoding)
//! - `entity_store` - The store trait, sessions and store implementations
//! - `datastore_sync_csv_sink` - Export pump
//! - `datastore_sync_csv_source` - Import pump
//!
//! # CLI Usage
//!
//! ```bash
//! # Export every kind of a store directory
//! datastore-sync export --source-dir ./store --output-dir ./dumps
//!
//! # Import an export directory into another store
//! datastore-sync import --target-dir ./restored --schema schema.yaml ./dumps/datastore-dump-...
//!
//! # Both in one run
//! datastore-sync migrate --source-dir ./store --target-dir ./restored --schema schema.yaml
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

mod run;

pub use run::{run_export, run_import, run_migrate, MigrateSummary};

// Re-export the pump crates for convenience
pub use datastore_sync_csv_sink as export;
pub use datastore_sync_csv_source as import;

use export::{ExportConfig, HeaderStrategy, DEFAULT_PAGE_SIZE, DEFAULT_SAMPLE_SIZE};
use import::DEFAULT_BATCH_SIZE;

/// Store to read records from
#[derive(Parser, Clone, Debug)]
pub struct SourceStoreOpts {
    /// Source store directory
    #[arg(long, env = "DATASTORE_SOURCE_DIR")]
    pub source_dir: PathBuf,
}

/// Store to write records to
#[derive(Parser, Clone, Debug)]
pub struct TargetStoreOpts {
    /// Target store directory (created if missing)
    #[arg(long, env = "DATASTORE_TARGET_DIR")]
    pub target_dir: PathBuf,
}

/// Column discovery mode on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderMode {
    /// Build the header from the first records of each kind
    Sample,
    /// Scan every record of a kind before writing
    #[value(name = "full-scan")]
    FullScan,
}

#[derive(Parser, Clone, Debug)]
pub struct ExportOpts {
    /// Directory under which the dump directory is created
    #[arg(long, default_value = ".", env = "DATASTORE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// How the column set of each kind is discovered
    #[arg(long, value_enum, default_value = "sample")]
    pub header_mode: HeaderMode,

    /// Number of records sampled per kind in sample mode
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    pub sample_size: usize,

    /// Number of records fetched per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Additional kinds to skip (repeatable)
    #[arg(long = "exclude-kind", value_name = "KIND")]
    pub excluded_kinds: Vec<String>,
}

impl ExportOpts {
    /// Build the export configuration.
    pub fn to_config(&self) -> ExportConfig {
        let header_strategy = match self.header_mode {
            HeaderMode::Sample => HeaderStrategy::BoundedSample(self.sample_size),
            HeaderMode::FullScan => HeaderStrategy::FullPreScan,
        };
        ExportConfig {
            output_dir: self.output_dir.clone(),
            header_strategy,
            page_size: self.page_size,
            excluded_kinds: self.excluded_kinds.clone(),
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ImportOpts {
    /// Schema file declaring the importable kinds
    #[arg(long, value_name = "PATH", env = "DATASTORE_SCHEMA")]
    pub schema: PathBuf,

    /// Number of records written per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Dry run mode - decode everything but don't write data
    #[arg(long)]
    pub dry_run: bool,
}
