//! Command implementations shared by the CLI and the integration tests.

use anyhow::{Context, Result};
use datastore_sync_csv_sink::{export, ExportSummary};
use datastore_sync_csv_source::{import, resolve_inputs, ImportConfig, ImportSummary};
use entity_store::{DirectoryStore, Session};
use std::path::{Path, PathBuf};
use sync_core::Schema;
use tracing::info;

use crate::{ExportOpts, ImportOpts, SourceStoreOpts, TargetStoreOpts};

/// Result of a migrate run.
#[derive(Debug, Clone)]
pub struct MigrateSummary {
    pub export: ExportSummary,
    pub import: ImportSummary,
}

fn load_schema(path: &Path) -> Result<Schema> {
    Schema::from_file(path).with_context(|| format!("Failed to load schema from {path:?}"))
}

/// Export every kind of the source store.
pub async fn run_export(source: &SourceStoreOpts, opts: &ExportOpts) -> Result<ExportSummary> {
    if !source.source_dir.is_dir() {
        anyhow::bail!(
            "Source store directory {} does not exist",
            source.source_dir.display()
        );
    }

    let store = DirectoryStore::new(&source.source_dir);
    let session = Session::open(&store)
        .await
        .context("Failed to open source store")?;
    let summary = export(&session, &opts.to_config()).await?;
    session.close();
    Ok(summary)
}

/// Import files (or directories of files) into the target store.
pub async fn run_import(
    target: &TargetStoreOpts,
    opts: &ImportOpts,
    inputs: &[PathBuf],
) -> Result<ImportSummary> {
    let schema = load_schema(&opts.schema)?;
    info!("Loaded schema with kinds: {:?}", schema.kind_names());

    let config = ImportConfig {
        files: resolve_inputs(inputs)?,
        batch_size: opts.batch_size,
        dry_run: opts.dry_run,
    };

    let store = DirectoryStore::new(&target.target_dir);
    let session = Session::open(&store)
        .await
        .context("Failed to open target store")?;
    let summary = import(&session, &schema, &config).await?;
    session.close();
    Ok(summary)
}

/// Export the source store and import the written files into the target.
///
/// The schema is loaded before anything is exported, so a bad schema file
/// fails the run without leaving a dump behind.
pub async fn run_migrate(
    source: &SourceStoreOpts,
    target: &TargetStoreOpts,
    export_opts: &ExportOpts,
    import_opts: &ImportOpts,
) -> Result<MigrateSummary> {
    load_schema(&import_opts.schema)?;

    let export = run_export(source, export_opts)
        .await
        .context("Export failed")?;
    let files: Vec<PathBuf> = export.files.iter().map(|f| f.path.clone()).collect();
    let import = run_import(target, import_opts, &files)
        .await
        .context("Import failed")?;

    Ok(MigrateSummary { export, import })
}
