//! Batch resolution of a delimited coordinate file.
//!
//! Each input row carries a coordinate pair; the matched features'
//! attributes are appended to the row, one output row per match. Rows with
//! no match are passed through with empty result columns.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use geocode_core::models::QueryRequest;
use geocode_query::{PlannerConfig, QueryService};

use crate::cli::BatchArgs;
use crate::config_loader;
use crate::output::OutputWriter;

const PROGRESS_EVERY: usize = 1000;

pub async fn execute(
    config_path: Option<&Path>,
    cli_sources: &[String],
    args: BatchArgs,
    output: &OutputWriter,
) -> Result<()> {
    let config = config_loader::load(config_path, cli_sources)?;

    let (store, _snapshot) = super::build_index(&config, output, false).await?;
    let service = QueryService::new(store, PlannerConfig::from_engine(&config.engine));
    // One pinned snapshot for the whole batch keeps every row consistent
    let snapshot = service.snapshot()?;

    let input = BufReader::new(
        File::open(&args.input)
            .with_context(|| format!("Cannot open input file {}", args.input.display()))?,
    );
    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Cannot create output file {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut rows = 0usize;
    let mut matched = 0usize;

    for (line_no, line) in input.lines().enumerate() {
        let line = line?;

        if args.header && line_no == 0 {
            writeln!(sink, "{}{}{}", line, args.delimiter, args.fields.join(&args.delimiter))?;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let (lon, lat) = parse_coordinates(&line, &args, line_no)?;
        let request =
            QueryRequest::new("").with_bias(lat, lon, args.radius).with_limit(args.limit);
        let outcome = service.search_on(&snapshot, &request)?;

        if outcome.results.is_empty() {
            let empty = args.delimiter.repeat(args.fields.len().saturating_sub(1));
            writeln!(sink, "{}{}{}", line, args.delimiter, empty)?;
        } else {
            matched += 1;
            for result in &outcome.results {
                let Some(record) = snapshot.record(result.id) else { continue };
                let values: Vec<String> = args
                    .fields
                    .iter()
                    .map(|field| {
                        record.attribute(field).map(|v| v.to_display()).unwrap_or_default()
                    })
                    .collect();
                writeln!(sink, "{}{}{}", line, args.delimiter, values.join(&args.delimiter))?;
            }
        }

        rows += 1;
        if rows % PROGRESS_EVERY == 0 {
            tracing::info!(rows, "batch progress");
        }
    }

    sink.flush()?;
    output.success(format!("Resolved {} rows ({} with matches)", rows, matched));
    output.result(serde_json::json!({"rows": rows, "matched": matched}))?;
    Ok(())
}

fn parse_coordinates(line: &str, args: &BatchArgs, line_no: usize) -> Result<(f64, f64)> {
    let fields: Vec<&str> = line.split(&args.delimiter).collect();

    let read = |column: usize, axis: &str| -> Result<f64> {
        let raw = fields.get(column).copied().unwrap_or("");
        raw.trim().parse::<f64>().with_context(|| {
            format!("Row {}: invalid {} coordinate '{}' in column {}", line_no + 1, axis, raw, column)
        })
    };

    let lon = read(args.column_x, "x")?;
    let lat = read(args.column_y, "y")?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        bail!("Row {}: coordinate ({}, {}) out of range", line_no + 1, lon, lat);
    }
    Ok((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> BatchArgs {
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            batch: BatchArgs,
        }
        let mut argv = vec!["test", "input.csv"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).batch
    }

    #[test]
    fn test_parse_coordinates() {
        let args = args(&[]);
        let (lon, lat) = parse_coordinates("-73.968,40.785,Central Park", &args, 0).unwrap();
        assert_eq!(lon, -73.968);
        assert_eq!(lat, 40.785);
    }

    #[test]
    fn test_parse_coordinates_custom_columns() {
        let args = args(&["--column-x", "2", "--column-y", "1", "--delimiter", "|"]);
        let (lon, lat) = parse_coordinates("id-7|40.785|-73.968", &args, 3).unwrap();
        assert_eq!(lon, -73.968);
        assert_eq!(lat, 40.785);
    }

    #[test]
    fn test_parse_coordinates_rejects_garbage() {
        let args = args(&[]);
        assert!(parse_coordinates("abc,def", &args, 0).is_err());
        assert!(parse_coordinates("", &args, 0).is_err());
        assert!(parse_coordinates("999.0,40.0", &args, 0).is_err());
    }
}
