use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Geocode Search - spatial and text search over geographic feature sources
#[derive(Parser, Debug)]
#[command(name = "geocode")]
#[command(about = "Spatial and text search over geographic feature sources", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the configuration file (default: geocode.toml when present)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Source locator; repeatable, overrides the configured source list
    #[arg(long = "source", short = 's', global = true, value_name = "LOCATOR")]
    pub sources: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the index from the configured sources and report per-source tallies
    Build(BuildArgs),

    /// Resolve a geocode query against a freshly built index
    Query(QueryArgs),

    /// Resolve a delimited file of coordinates, appending matched attributes
    Batch(BatchArgs),

    /// Show the effective configuration and resolved sources
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Suppress the progress display
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Query text; may be empty only when a bias is given
    #[arg(default_value = "")]
    pub text: String,

    /// Bias latitude
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,

    /// Bias longitude
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,

    /// Bias radius in meters
    #[arg(long, default_value = "5000")]
    pub radius: f64,

    /// Bounding box restriction as min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_name = "BOX")]
    pub bbox: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Attribute equality filter as key=value; repeatable
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Show the per-stage query trace
    #[arg(long)]
    pub explain: bool,
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Input file of delimited coordinate rows
    pub input: PathBuf,

    /// Output file; stdout when omitted
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: String,

    /// Zero-based column of the X (longitude) coordinate
    #[arg(long, default_value = "0")]
    pub column_x: usize,

    /// Zero-based column of the Y (latitude) coordinate
    #[arg(long, default_value = "1")]
    pub column_y: usize,

    /// Treat the first input row as a header and pass it through
    #[arg(long)]
    pub header: bool,

    /// Search radius per row, meters
    #[arg(long, default_value = "1000")]
    pub radius: f64,

    /// Matches emitted per input row
    #[arg(long, default_value = "1")]
    pub limit: usize,

    /// Attribute keys appended to each output row
    #[arg(long, value_delimiter = ',', default_value = "name")]
    pub fields: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Also build the index and show snapshot statistics
    #[arg(long)]
    pub build: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_parsing() {
        let cli = Cli::parse_from([
            "geocode", "query", "Central", "--lat", "40.78", "--lon", "-73.97", "--limit", "1",
        ]);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.text, "Central");
                assert_eq!(args.lat, Some(40.78));
                assert_eq!(args.limit, Some(1));
                assert_eq!(args.radius, 5000.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_batch_defaults() {
        let cli = Cli::parse_from(["geocode", "batch", "points.csv"]);
        match cli.command {
            Commands::Batch(args) => {
                assert_eq!(args.delimiter, ",");
                assert_eq!(args.column_x, 0);
                assert_eq!(args.column_y, 1);
                assert_eq!(args.fields, vec!["name".to_string()]);
                assert!(!args.header);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
