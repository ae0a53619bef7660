//! Runtime configuration.
//!
//! Every binary builds one `CompareConfig` and passes it down explicitly.
//! Values come from an optional TOML file named by `SOLAR_COMPARE_CONFIG`
//! (a `.env` file is honored), with defaults matching the source registry
//! so the binaries work with no configuration at all.
//!
//! ```toml
//! data_dir = "data"
//! output_path = "outputs/compare/summary_table.md"
//! metrics = ["GHI", "DNI", "DHI"]
//! test_metric = "GHI"
//! log_level = "info"
//!
//! [[sources]]
//! label = "Benin"
//! path = "benin_clean.csv"
//! ```

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogLevel;
use crate::model::CompareError;
use crate::sources::{self, SourceMap, DEFAULT_METRICS, METRIC_GHI};

/// Environment variable naming the TOML config file.
pub const CONFIG_ENV_VAR: &str = "SOLAR_COMPARE_CONFIG";

/// Environment variable overriding the configured log level.
pub const LOG_LEVEL_ENV_VAR: &str = "SOLAR_COMPARE_LOG_LEVEL";

// ---------------------------------------------------------------------------
// TOML structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceEntry {
    pub label: String,
    /// Relative paths resolve against `data_dir`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompareConfig {
    pub data_dir: PathBuf,
    pub output_path: PathBuf,
    pub json_output: Option<PathBuf>,
    pub metrics: Vec<String>,
    pub test_metric: String,
    /// Empty means "use the source registry".
    pub sources: Vec<SourceEntry>,
    pub log_level: String,
    pub log_file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_path: PathBuf::from("outputs/compare/summary_table.md"),
            json_output: None,
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            test_metric: METRIC_GHI.to_string(),
            sources: Vec::new(),
            log_level: "info".to_string(),
            log_file: None,
            console_timestamps: false,
        }
    }
}

impl CompareConfig {
    /// Parses a TOML document and validates the result.
    pub fn from_toml_str(content: &str) -> Result<Self, CompareError> {
        let config: CompareConfig =
            toml::from_str(content).map_err(|e| CompareError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CompareError> {
        let content = fs::read_to_string(path).map_err(|e| CompareError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `.env`, then the file named by `SOLAR_COMPARE_CONFIG` if set,
    /// otherwise the defaults. `SOLAR_COMPARE_LOG_LEVEL` wins over the file.
    pub fn from_env() -> Result<Self, CompareError> {
        dotenv::dotenv().ok();

        let mut config = match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        if let Ok(level) = env::var(LOG_LEVEL_ENV_VAR) {
            config.log_level = level;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        if self.metrics.is_empty() {
            return Err(CompareError::Config("metrics must not be empty".to_string()));
        }
        if !self.metrics.contains(&self.test_metric) {
            return Err(CompareError::Config(format!(
                "test_metric '{}' is not in metrics {:?}",
                self.test_metric, self.metrics
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &self.sources {
            if !seen.insert(entry.label.as_str()) {
                return Err(CompareError::Config(format!(
                    "duplicate source label '{}'",
                    entry.label
                )));
            }
        }
        if LogLevel::parse(&self.log_level).is_none() {
            return Err(CompareError::Config(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    /// The label → path mapping with relative paths resolved.
    pub fn source_map(&self) -> SourceMap {
        if self.sources.is_empty() {
            return sources::default_source_map(&self.data_dir);
        }
        let mut map = SourceMap::new();
        for entry in &self.sources {
            let path = if entry.path.is_absolute() {
                entry.path.clone()
            } else {
                self.data_dir.join(&entry.path)
            };
            map.insert(&entry.label, path);
        }
        map
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level).unwrap_or(LogLevel::Info)
    }

    /// Initializes the global logger from this configuration.
    pub fn init_logging(&self) {
        crate::logging::init_logger(self.level(), self.log_file.as_deref(), self.console_timestamps);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
