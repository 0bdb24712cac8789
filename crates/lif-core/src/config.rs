//! LIF Configuration Management
//!
//! Handles configuration from environment variables and TOML files, with
//! defaults suitable for running producers locally.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Named-entity models
    pub ner: NerConfig,

    /// Constituency parser model
    pub parser: ParserConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        EnvOverrides::from_process()?.apply(&mut config);
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        EnvOverrides::from_process()?.apply(&mut self);
        Ok(self)
    }

    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?.with_env_override()?,
            None => Self::from_env()?,
        };
        Ok(config)
    }
}

/// Values set through `LIF_*` variables; unset variables leave the config alone
#[derive(Debug, Default)]
struct EnvOverrides {
    level: Option<String>,
    json_format: Option<bool>,
    gazetteers: Option<Vec<PathBuf>>,
    treebank: Option<PathBuf>,
}

impl EnvOverrides {
    fn from_process() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let json_format = lookup("LIF_LOG_JSON")
            .map(|value| parse_bool("LIF_LOG_JSON", &value))
            .transpose()?;

        // Comma-separated list of gazetteer files
        let gazetteers = lookup("LIF_GAZETTEERS").map(|paths| {
            paths
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect()
        });

        let treebank = lookup("LIF_TREEBANK")
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            level: lookup("LIF_LOG_LEVEL"),
            json_format,
            gazetteers,
            treebank,
        })
    }

    fn apply(self, config: &mut AppConfig) {
        if let Some(level) = self.level {
            config.logging.level = level;
        }
        if let Some(json_format) = self.json_format {
            config.logging.json_format = json_format;
        }
        if let Some(gazetteers) = self.gazetteers {
            config.ner.gazetteers = gazetteers;
        }
        if let Some(treebank) = self.treebank {
            config.parser.treebank = Some(treebank);
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Named-entity model configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    /// Gazetteer model files, each loaded as one name finder (in order)
    pub gazetteers: Vec<PathBuf>,
}

/// Parser model configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Treebank file backing the constituency parser
    pub treebank: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
