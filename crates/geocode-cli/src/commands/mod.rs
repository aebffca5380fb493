mod batch;
mod build;
mod inspect;
mod query;

use anyhow::{Context, Result};
use std::sync::Arc;

use geocode_index::{IndexBuilder, IndexSnapshot, SnapshotStore};
use geocode_sources::{resolve_locator, GeometrySource};

use crate::cli::{Cli, Commands};
use crate::config_loader::CliConfig;
use crate::output::OutputWriter;
use crate::progress;

pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Build(args) => build::execute(config_path, &cli.sources, args, &output).await,
        Commands::Query(args) => query::execute(config_path, &cli.sources, args, &output).await,
        Commands::Batch(args) => batch::execute(config_path, &cli.sources, args, &output).await,
        Commands::Inspect(args) => inspect::execute(config_path, &cli.sources, args, &output).await,
    }
}

/// Resolve the configured locators into adapters
pub(crate) fn resolve_sources(config: &CliConfig) -> Result<Vec<Box<dyn GeometrySource>>> {
    config
        .sources
        .iter()
        .map(|locator| {
            resolve_locator(locator).with_context(|| format!("Cannot resolve source {}", locator))
        })
        .collect()
}

/// Build a snapshot from the configured sources, with a progress spinner in
/// human mode.
pub(crate) async fn build_index(
    config: &CliConfig,
    output: &OutputWriter,
    quiet: bool,
) -> Result<(Arc<SnapshotStore>, Arc<IndexSnapshot>)> {
    let sources = resolve_sources(config)?;
    let store = Arc::new(SnapshotStore::new());
    let builder = IndexBuilder::new(
        store.clone(),
        config.engine.abort_threshold.value,
        config.engine.text_fields.value.clone(),
    );

    let show_spinner = !quiet && !output.is_json();
    let spinner = show_spinner.then(|| progress::create_spinner("Building index..."));

    let result = builder
        .build_with_progress(&sources, |p| {
            if let Some(pb) = &spinner {
                progress::apply_progress(pb, &p);
            }
        })
        .await;

    match result {
        Ok(snapshot) => {
            if let Some(pb) = &spinner {
                progress::finish_success(
                    pb,
                    &format!("Indexed {} features", snapshot.len()),
                );
            }
            Ok((store, snapshot))
        }
        Err(e) => {
            if let Some(pb) = &spinner {
                progress::finish_error(pb, "Build failed");
            }
            Err(e).context("Index build failed")
        }
    }
}
