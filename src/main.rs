//! Command-line interface for datastore-sync
//!
//! # Usage Examples
//!
//! ## Export
//! ```bash
//! # Sample the first 20 records of each kind for the header
//! datastore-sync export --source-dir ./store --output-dir ./dumps
//!
//! # Scan every record first so no column is dropped
//! datastore-sync export --source-dir ./store --header-mode full-scan \
//!   --exclude-kind Scratch
//! ```
//!
//! ## Import
//! ```bash
//! # Files and directories can be mixed; directories are expanded to *.csv
//! datastore-sync import --target-dir ./restored --schema schema.yaml \
//!   ./dumps/datastore-dump-20240101T000000.000Z
//!
//! # Decode everything without writing
//! datastore-sync import --target-dir ./restored --schema schema.yaml --dry-run Order-01.csv
//! ```
//!
//! ## Migrate
//! ```bash
//! datastore-sync migrate --source-dir ./store --target-dir ./restored \
//!   --schema schema.yaml --output-dir /tmp
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to see progress.

use clap::{Parser, Subcommand};
use datastore_sync::{
    run_export, run_import, run_migrate, ExportOpts, ImportOpts, SourceStoreOpts,
    TargetStoreOpts,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "datastore-sync")]
#[command(about = "Export entity store kinds to delimited text files and import them back")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write every kind of a store to its own file
    Export {
        #[command(flatten)]
        source: SourceStoreOpts,

        #[command(flatten)]
        export: ExportOpts,
    },

    /// Load exported files into a store
    Import {
        #[command(flatten)]
        target: TargetStoreOpts,

        #[command(flatten)]
        import: ImportOpts,

        /// Files or directories to import
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Export a store and import the written files into another store
    Migrate {
        #[command(flatten)]
        source: SourceStoreOpts,

        #[command(flatten)]
        target: TargetStoreOpts,

        #[command(flatten)]
        export: ExportOpts,

        #[command(flatten)]
        import: ImportOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export { source, export } => {
            let summary = run_export(&source, &export).await?;
            println!(
                "Exported {} rows from {} kinds to {}",
                summary.rows_written(),
                summary.files.len(),
                summary.dump_dir.display()
            );
        }
        Commands::Import {
            target,
            import,
            inputs,
        } => {
            let summary = run_import(&target, &import, &inputs).await?;
            println!(
                "Imported {} records in {} batches from {} files ({} skipped)",
                summary.records_written,
                summary.batches_written,
                summary.files_loaded.len(),
                summary.skipped_files.len()
            );
        }
        Commands::Migrate {
            source,
            target,
            export,
            import,
        } => {
            let summary = run_migrate(&source, &target, &export, &import).await?;
            println!(
                "Migrated {} of {} exported rows via {}",
                summary.import.records_written,
                summary.export.rows_written(),
                summary.export.dump_dir.display()
            );
        }
    }

    Ok(())
}
