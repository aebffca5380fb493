//! Layered engine configuration.
//!
//! Values resolve with precedence Default < File < Environment < CLI. Every
//! value remembers where it came from so `inspect` can report the effective
//! configuration.

use crate::error::{GeocodeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered engine configuration for Geocode Search
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Weight of the text score in the combined ranking score
    pub w_text: ConfigValue<f64>,
    /// Weight of the spatial score in the combined ranking score
    pub w_spatial: ConfigValue<f64>,
    /// Hard cap on bias radii, meters
    pub max_bias_radius_m: ConfigValue<f64>,
    /// Maximum Levenshtein distance for fuzzy token matches
    pub fuzzy_max_edits: ConfigValue<u32>,
    /// Per-source failure rate above which ingestion aborts, in [0, 1]
    pub abort_threshold: ConfigValue<f64>,
    /// Query deadline, milliseconds
    pub query_timeout_ms: ConfigValue<u64>,
    /// Result limit applied when a request does not carry one
    pub default_limit: ConfigValue<usize>,
    /// Hard cap on requested result limits
    pub max_limit: ConfigValue<usize>,
    /// Attribute keys fed to the text index; None indexes every text attribute
    pub text_fields: ConfigValue<Option<Vec<String>>>,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            w_text: ConfigValue::new(0.6, ConfigSource::Default),
            w_spatial: ConfigValue::new(0.4, ConfigSource::Default),
            max_bias_radius_m: ConfigValue::new(50_000.0, ConfigSource::Default),
            fuzzy_max_edits: ConfigValue::new(2, ConfigSource::Default),
            abort_threshold: ConfigValue::new(0.5, ConfigSource::Default),
            query_timeout_ms: ConfigValue::new(5_000, ConfigSource::Default),
            default_limit: ConfigValue::new(10, ConfigSource::Default),
            max_limit: ConfigValue::new(100, ConfigSource::Default),
            text_fields: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeocodeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeocodeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(v) = file_config.w_text {
            self.w_text.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.w_spatial {
            self.w_spatial.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.max_bias_radius_m {
            self.max_bias_radius_m.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.fuzzy_max_edits {
            self.fuzzy_max_edits.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.abort_threshold {
            self.abort_threshold.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.query_timeout_ms {
            self.query_timeout_ms.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.default_limit {
            self.default_limit.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.max_limit {
            self.max_limit.update(v, ConfigSource::File);
        }
        if let Some(v) = file_config.text_fields {
            self.text_fields.update(Some(v), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
            match env::var(name) {
                Ok(raw) => match raw.parse::<T>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!("Invalid {} value '{}'", name, raw);
                        None
                    }
                },
                Err(_) => None,
            }
        }

        if let Some(v) = parse_env::<f64>("GEOCODE_W_TEXT") {
            self.w_text.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<f64>("GEOCODE_W_SPATIAL") {
            self.w_spatial.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<f64>("GEOCODE_MAX_BIAS_RADIUS_M") {
            self.max_bias_radius_m.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<u32>("GEOCODE_FUZZY_MAX_EDITS") {
            self.fuzzy_max_edits.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<f64>("GEOCODE_ABORT_THRESHOLD") {
            self.abort_threshold.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<u64>("GEOCODE_QUERY_TIMEOUT_MS") {
            self.query_timeout_ms.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<usize>("GEOCODE_DEFAULT_LIMIT") {
            self.default_limit.update(v, ConfigSource::Environment);
        }
        if let Some(v) = parse_env::<usize>("GEOCODE_MAX_LIMIT") {
            self.max_limit.update(v, ConfigSource::Environment);
        }
        if let Ok(raw) = env::var("GEOCODE_TEXT_FIELDS") {
            let fields: Vec<String> =
                raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
            if !fields.is_empty() {
                self.text_fields.update(Some(fields), ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(v) = overrides.w_text {
            self.w_text.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.w_spatial {
            self.w_spatial.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.max_bias_radius_m {
            self.max_bias_radius_m.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.fuzzy_max_edits {
            self.fuzzy_max_edits.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.abort_threshold {
            self.abort_threshold.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.query_timeout_ms {
            self.query_timeout_ms.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.default_limit {
            self.default_limit.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.max_limit {
            self.max_limit.update(v, ConfigSource::Cli);
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.w_text.value < 0.0 || self.w_spatial.value < 0.0 {
            return Err(GeocodeError::ConfigInvalid {
                key: "w_text/w_spatial".to_string(),
                reason: "Scoring weights must be non-negative".to_string(),
            });
        }
        if self.w_text.value + self.w_spatial.value <= 0.0 {
            return Err(GeocodeError::ConfigInvalid {
                key: "w_text/w_spatial".to_string(),
                reason: "At least one scoring weight must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.abort_threshold.value) {
            return Err(GeocodeError::ConfigInvalid {
                key: "abort_threshold".to_string(),
                reason: format!("Must be in [0, 1], got {}", self.abort_threshold.value),
            });
        }
        if self.max_bias_radius_m.value <= 0.0 {
            return Err(GeocodeError::ConfigInvalid {
                key: "max_bias_radius_m".to_string(),
                reason: "Must be positive".to_string(),
            });
        }
        if self.default_limit.value == 0 || self.max_limit.value == 0 {
            return Err(GeocodeError::ConfigInvalid {
                key: "default_limit/max_limit".to_string(),
                reason: "Limits must be positive".to_string(),
            });
        }
        if self.default_limit.value > self.max_limit.value {
            return Err(GeocodeError::ConfigInvalid {
                key: "default_limit".to_string(),
                reason: format!(
                    "default_limit {} exceeds max_limit {}",
                    self.default_limit.value, self.max_limit.value
                ),
            });
        }
        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();
        map.insert(
            "w_text".to_string(),
            (format!("{}", self.w_text.value), self.w_text.source),
        );
        map.insert(
            "w_spatial".to_string(),
            (format!("{}", self.w_spatial.value), self.w_spatial.source),
        );
        map.insert(
            "max_bias_radius_m".to_string(),
            (format!("{}", self.max_bias_radius_m.value), self.max_bias_radius_m.source),
        );
        map.insert(
            "fuzzy_max_edits".to_string(),
            (format!("{}", self.fuzzy_max_edits.value), self.fuzzy_max_edits.source),
        );
        map.insert(
            "abort_threshold".to_string(),
            (format!("{}", self.abort_threshold.value), self.abort_threshold.source),
        );
        map.insert(
            "query_timeout_ms".to_string(),
            (format!("{}", self.query_timeout_ms.value), self.query_timeout_ms.source),
        );
        map.insert(
            "default_limit".to_string(),
            (format!("{}", self.default_limit.value), self.default_limit.source),
        );
        map.insert(
            "max_limit".to_string(),
            (format!("{}", self.max_limit.value), self.max_limit.source),
        );
        map.insert(
            "text_fields".to_string(),
            (
                self.text_fields
                    .value
                    .as_ref()
                    .map(|f| f.join(","))
                    .unwrap_or_else(|| "all".to_string()),
                self.text_fields.source,
            ),
        );
        map
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    w_text: Option<f64>,
    w_spatial: Option<f64>,
    max_bias_radius_m: Option<f64>,
    fuzzy_max_edits: Option<u32>,
    abort_threshold: Option<f64>,
    query_timeout_ms: Option<u64>,
    default_limit: Option<usize>,
    max_limit: Option<usize>,
    text_fields: Option<Vec<String>>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub w_text: Option<f64>,
    pub w_spatial: Option<f64>,
    pub max_bias_radius_m: Option<f64>,
    pub fuzzy_max_edits: Option<u32>,
    pub abort_threshold: Option<f64>,
    pub query_timeout_ms: Option<u64>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::with_defaults();
        assert_eq!(config.w_text.value, 0.6);
        assert_eq!(config.w_text.source, ConfigSource::Default);
        assert_eq!(config.fuzzy_max_edits.value, 2);
        assert_eq!(config.default_limit.value, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
w_text = 0.7
w_spatial = 0.3
max_bias_radius_m = 10000.0
fuzzy_max_edits = 1
text_fields = ["name", "address"]
"#
        )
        .unwrap();

        let config = EngineConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.w_text.value, 0.7);
        assert_eq!(config.w_text.source, ConfigSource::File);
        assert_eq!(config.fuzzy_max_edits.value, 1);
        assert_eq!(
            config.text_fields.value,
            Some(vec!["name".to_string(), "address".to_string()])
        );
        // Untouched values keep their defaults
        assert_eq!(config.query_timeout_ms.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = EngineConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            w_text: Some(0.9),
            max_limit: Some(50),
            ..Default::default()
        });

        assert_eq!(config.w_text.value, 0.9);
        assert_eq!(config.w_text.source, ConfigSource::Cli);
        assert_eq!(config.max_limit.value, 50);
        assert_eq!(config.w_spatial.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::with_defaults();
        config.abort_threshold.update(1.5, ConfigSource::Cli);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::with_defaults();
        config.w_text.update(0.0, ConfigSource::Cli);
        config.w_spatial.update(0.0, ConfigSource::Cli);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::with_defaults();
        config.default_limit.update(500, ConfigSource::Cli);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = EngineConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("w_text"));
        assert!(map.contains_key("abort_threshold"));
        let (fields, source) = &map["text_fields"];
        assert_eq!(fields, "all");
        assert_eq!(*source, ConfigSource::Default);
    }
}
