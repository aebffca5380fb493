//! Resolves the engine configuration and source list for a CLI invocation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use geocode_core::config::EngineConfig;

const DEFAULT_CONFIG_FILE: &str = "geocode.toml";

/// Everything a command needs to run
pub struct CliConfig {
    pub engine: EngineConfig,
    pub sources: Vec<String>,
}

/// CLI-level keys of the configuration file, beyond the engine values
#[derive(Debug, Deserialize, Default)]
struct CliFileConfig {
    #[serde(default)]
    sources: Vec<String>,
}

pub fn load(config_path: Option<&Path>, cli_sources: &[String]) -> Result<CliConfig> {
    let path = resolve_config_path(config_path);

    let mut engine = EngineConfig::with_defaults();
    let mut file_sources = Vec::new();

    if let Some(path) = &path {
        engine = engine
            .load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        let content = fs::read_to_string(path)?;
        let file_config: CliFileConfig =
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
        file_sources = file_config.sources;
    }

    let engine = engine.load_from_env();
    engine.validate().context("Invalid configuration")?;

    let sources = if cli_sources.is_empty() { file_sources } else { cli_sources.to_vec() };
    if sources.is_empty() {
        bail!(
            "No sources configured. Pass --source or list them under `sources` in {}",
            path.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG_FILE)).display()
        );
    }

    Ok(CliConfig { engine, sources })
}

/// Explicit path, or the default file when it exists in the working directory
fn resolve_config_path(config_path: Option<&Path>) -> Option<PathBuf> {
    match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}
