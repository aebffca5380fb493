use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::cli::InspectArgs;
use crate::config_loader;
use crate::output::OutputWriter;

#[derive(Tabled, Serialize)]
struct ConfigRow {
    key: String,
    value: String,
    source: String,
}

#[derive(Tabled, Serialize)]
struct SourceRow {
    locator: String,
    kind: String,
}

pub async fn execute(
    config_path: Option<&Path>,
    cli_sources: &[String],
    args: InspectArgs,
    output: &OutputWriter,
) -> Result<()> {
    let config = config_loader::load(config_path, cli_sources)?;

    let mut config_rows: Vec<ConfigRow> = config
        .engine
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow { key, value, source: format!("{:?}", source) })
        .collect();
    config_rows.sort_by(|a, b| a.key.cmp(&b.key));

    output.section("Configuration");
    output.table(config_rows);

    let source_rows: Vec<SourceRow> = config
        .sources
        .iter()
        .map(|locator| {
            let kind = geocode_sources::resolve_locator(locator)
                .map(|s| s.kind().to_string())
                .unwrap_or_else(|_| "unsupported".to_string());
            SourceRow { locator: locator.clone(), kind }
        })
        .collect();

    output.section("Sources");
    output.table(source_rows);

    let mut inspection = serde_json::json!({
        "config": config.engine.to_inspection_map().into_iter()
            .map(|(k, (v, s))| (k, serde_json::json!({"value": v, "source": format!("{:?}", s)})))
            .collect::<serde_json::Map<String, serde_json::Value>>(),
        "sources": config.sources,
    });

    if args.build {
        let (_store, snapshot) = super::build_index(&config, output, false).await?;

        output.section("Snapshot");
        output.kv("Generation", snapshot.generation);
        output.kv("Features", snapshot.len());
        output.kv("Text tokens", snapshot.text.vocabulary_len());
        output.kv("Built at", snapshot.built_at.to_rfc3339());
        output.kv("Skipped records", snapshot.report.total_skipped());

        inspection["snapshot"] = serde_json::json!({
            "generation": snapshot.generation,
            "features": snapshot.len(),
            "text_tokens": snapshot.text.vocabulary_len(),
            "built_at": snapshot.built_at.to_rfc3339(),
            "skipped": snapshot.report.total_skipped(),
        });
    }

    output.result(inspection)?;
    Ok(())
}
