//! Configuration handling for sqlproc.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sqlproc_export::ConsoleFormat;
use sqlproc_extract::ExtractorConfig;
use sqlproc_index::PipelineConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the config file inside the config directory.
const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Directory directives (`<path>:<type>`) used when none are given on
    /// the command line
    #[serde(default)]
    pub directories: Vec<String>,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pipeline-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Capacity of the channels between stages
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Debounce duration for the directory watcher (ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Files read and split at the same time
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_max_concurrent_files() -> usize {
    1
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            debounce_ms: default_debounce_ms(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

/// Output-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Statement line format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Console output format, shared by the config file and `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<OutputFormat> for ConsoleFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ConsoleFormat::Text,
            OutputFormat::Json => ConsoleFormat::Json,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the config from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load the config from `path`, or from the default location.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        match path.or_else(Self::config_path) {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Default config file path.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Annotated sample config file.
    pub fn sample_toml() -> &'static str {
        r#"# sqlproc configuration

# Directories to watch when none are given on the command line.
# Each entry is "<path>:<type>", type one of postgres, mysql, sqlite.
directories = [
    "./sql/postgres:postgres",
]

[pipeline]
# Capacity of the channels between watcher, extractor and dispatcher
channel_capacity = 64
# Debounce window for filesystem notifications (ms)
debounce_ms = 100
# Files read and split at the same time
max_concurrent_files = 1

[output]
# "text" or "json"
format = "text"

[logging]
level = "info"
"#
    }

    /// Library-side pipeline settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            channel_capacity: self.pipeline.channel_capacity,
            debounce: Duration::from_millis(self.pipeline.debounce_ms),
            extractor: ExtractorConfig {
                max_concurrent_files: self.pipeline.max_concurrent_files,
            },
        }
    }
}

/// Get the XDG config directory for sqlproc.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SQLPROC_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "sqlproc").map(|dirs| dirs.config_dir().to_path_buf())
}
