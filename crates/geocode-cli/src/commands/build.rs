use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::cli::BuildArgs;
use crate::config_loader;
use crate::output::OutputWriter;

#[derive(Tabled, Serialize)]
struct SourceRow {
    source: String,
    read: usize,
    indexed: usize,
    skipped: usize,
    status: String,
}

pub async fn execute(
    config_path: Option<&Path>,
    cli_sources: &[String],
    args: BuildArgs,
    output: &OutputWriter,
) -> Result<()> {
    let config = config_loader::load(config_path, cli_sources)?;
    let (_store, snapshot) = super::build_index(&config, output, args.quiet).await?;

    let rows: Vec<SourceRow> = snapshot
        .report
        .sources
        .iter()
        .map(|s| SourceRow {
            source: s.source_id.clone(),
            read: s.read,
            indexed: s.indexed,
            skipped: s.skipped,
            status: s.error.clone().unwrap_or_else(|| "ok".to_string()),
        })
        .collect();

    output.section("Sources");
    output.table(rows);

    for report in &snapshot.report.sources {
        if let Some(error) = &report.error {
            output.warning(format!("{}: {}", report.source_id, error));
        }
    }

    output.success(format!(
        "Built generation {} with {} features ({} skipped)",
        snapshot.generation,
        snapshot.len(),
        snapshot.report.total_skipped(),
    ));

    output.result(serde_json::json!({
        "generation": snapshot.generation,
        "features": snapshot.len(),
        "skipped": snapshot.report.total_skipped(),
        "sources": snapshot.report.sources.iter().map(|s| serde_json::json!({
            "source": s.source_id,
            "read": s.read,
            "indexed": s.indexed,
            "skipped": s.skipped,
            "error": s.error,
        })).collect::<Vec<_>>(),
    }))?;

    Ok(())
}
