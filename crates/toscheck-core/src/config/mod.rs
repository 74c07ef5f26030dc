//! Configuration management for toscheck.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `toscheck.toml` file
//! 3. User config `~/.config/toscheck/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import resolution and base types.
    pub checker: CheckerConfig,

    pub logging: LoggingConfig,

    /// Report rendering.
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./toscheck.toml` (project local)
    /// 2. `~/.config/toscheck/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration text, without environment overrides.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(paths) = std::env::var(ENV_SEARCH_PATH) {
            self.checker.search_paths.extend(
                paths
                    .split(':')
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            );
        }
        if std::env::var_os(ENV_NO_COMMONS).is_some() {
            self.checker.use_commons = false;
        }
        if let Ok(level) = std::env::var(ENV_LOG) {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var(ENV_REPORT_FORMAT) {
            self.report.format = format;
        }
    }

    /// Rejects values the rest of the program cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.report.output_format()?;
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// How documents and their imports are found, and which base types apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Directories searched for relative references.
    pub search_paths: Vec<String>,

    /// Common type documents, by resource name or path.
    pub commons: Vec<String>,

    /// Load the common types into the base catalog.
    pub use_commons: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(|s| s.to_string()).collect(),
            commons: DEFAULT_COMMONS.iter().map(|s| s.to_string()).collect(),
            use_commons: DEFAULT_USE_COMMONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Report rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// "text" or "json".
    pub format: String,

    /// Print imported targets too, not only the ones checked directly.
    pub show_imports: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_REPORT_FORMAT.to_string(),
            show_imports: DEFAULT_SHOW_IMPORTS,
        }
    }
}

impl ReportConfig {
    pub fn output_format(&self) -> Result<OutputFormat, ConfigError> {
        self.format.parse()
    }
}

/// Report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::Invalid(format!(
                "Unknown report format '{}', expected text or json",
                other
            ))),
        }
    }
}
