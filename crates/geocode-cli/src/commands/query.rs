use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use geocode_core::models::{BoundingBox, QueryRequest};
use geocode_query::{PlannerConfig, QueryService};

use crate::cli::QueryArgs;
use crate::config_loader;
use crate::output::OutputWriter;

#[derive(Tabled)]
struct ResultRow {
    rank: usize,
    name: String,
    score: String,
    text: String,
    spatial: String,
    source: String,
}

#[derive(Serialize)]
struct ResultJson {
    rank: usize,
    id: u64,
    combined_score: f64,
    text_score: f64,
    spatial_score: f64,
    attributes: serde_json::Value,
    geometry: serde_json::Value,
    source: String,
    key: String,
}

pub async fn execute(
    config_path: Option<&Path>,
    cli_sources: &[String],
    args: QueryArgs,
    output: &OutputWriter,
) -> Result<()> {
    let config = config_loader::load(config_path, cli_sources)?;
    let request = build_request(&args)?;

    let (store, _snapshot) = super::build_index(&config, output, false).await?;
    let service = QueryService::new(store, PlannerConfig::from_engine(&config.engine));

    let snapshot = service.snapshot()?;
    let outcome = service.search_on(&snapshot, &request).context("Query failed")?;

    if args.explain {
        output.section("Trace");
        for stage in &outcome.trace.stages {
            output.kv(format!("{:?}", stage.stage), stage.candidates);
        }
    }

    output.section("Results");
    let rows: Vec<ResultRow> = outcome
        .results
        .iter()
        .filter_map(|r| {
            let record = snapshot.record(r.id)?;
            Some(ResultRow {
                rank: r.rank + 1,
                name: record
                    .attribute("name")
                    .map(|v| v.to_display())
                    .unwrap_or_else(|| format!("feature {}", r.id)),
                score: format!("{:.3}", r.combined_score),
                text: format!("{:.3}", r.text_score),
                spatial: format!("{:.3}", r.spatial_score),
                source: format!("{}:{}", record.source_ref.source_id, record.source_ref.key),
            })
        })
        .collect();
    output.table(rows);

    let json_results: Vec<ResultJson> = outcome
        .results
        .iter()
        .filter_map(|r| {
            let record = snapshot.record(r.id)?;
            Some(ResultJson {
                rank: r.rank,
                id: r.id.0,
                combined_score: r.combined_score,
                text_score: r.text_score,
                spatial_score: r.spatial_score,
                attributes: serde_json::to_value(&record.attributes).unwrap_or_default(),
                geometry: record.geometry.to_geojson(),
                source: record.source_ref.source_id.clone(),
                key: record.source_ref.key.clone(),
            })
        })
        .collect();
    output.result(json_results)?;

    Ok(())
}

fn build_request(args: &QueryArgs) -> Result<QueryRequest> {
    let mut request = QueryRequest::new(args.text.clone());

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        request = request.with_bias(lat, lon, args.radius);
    }

    if let Some(bbox) = &args.bbox {
        request = request.with_bbox(parse_bbox(bbox)?);
    }

    if let Some(limit) = args.limit {
        request = request.with_limit(limit);
    }

    for filter in &args.filters {
        match filter.split_once('=') {
            Some((key, value)) => request = request.with_filter(key, value),
            None => bail!("Invalid filter '{}': expected key=value", filter),
        }
    }

    Ok(request)
}

fn parse_bbox(raw: &str) -> Result<BoundingBox> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid bounding box '{}'", raw))?;
    if parts.len() != 4 {
        bail!("Invalid bounding box '{}': expected min_lon,min_lat,max_lon,max_lat", raw);
    }
    Ok(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = parse_bbox("-74.05, 40.65, -73.99, 40.75").unwrap();
        assert_eq!(bbox.min_x, -74.05);
        assert_eq!(bbox.max_y, 40.75);

        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }
}
