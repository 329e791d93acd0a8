//! Configuration management for sharpgraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `sharpgraph.toml` file
//! 3. User config `~/.config/sharpgraph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
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
    /// Graph store configuration.
    pub store: StoreConfig,

    /// Batch input configuration.
    pub input: InputConfig,

    /// Report and dump files.
    pub output: OutputConfig,

    /// Extraction behavior switches.
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./sharpgraph.toml` (project local)
    /// 2. `~/.config/sharpgraph/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(LOCAL_CONFIG_FILE).exists() {
            return Self::from_file(LOCAL_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sharpgraph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Store overrides
        if let Ok(path) = std::env::var("SHARPGRAPH_DB_PATH") {
            self.store.path = Some(path);
        }
        if let Ok(ns) = std::env::var("SHARPGRAPH_DB_NAMESPACE") {
            self.store.namespace = ns;
        }
        if let Ok(db) = std::env::var("SHARPGRAPH_DB_DATABASE") {
            self.store.database = db;
        }
        if let Some(purge) = env_flag("SHARPGRAPH_PURGE") {
            self.store.purge_on_start = purge;
        }

        // Output overrides
        if let Ok(file) = std::env::var("SHARPGRAPH_REPORT_FILE") {
            self.output.report_file = file;
        }

        // Analysis overrides
        if let Some(expand) = env_flag("SHARPGRAPH_EXPAND_DECLARATORS") {
            self.analysis.expand_declarators = expand;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.output.report_file.trim().is_empty() {
            return Err(ConfigError::Invalid("output.report_file must not be empty".to_string()));
        }
        if self.input.extensions.is_empty() {
            return Err(ConfigError::Invalid("input.extensions must list at least one extension".to_string()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database directory. Defaults to `<save-path>/graph.db`.
    pub path: Option<String>,

    /// SurrealDB namespace.
    pub namespace: String,

    /// SurrealDB database.
    pub database: String,

    /// Remove all nodes and edges before extracting.
    pub purge_on_start: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            namespace: DEFAULT_DB_NAMESPACE.to_string(),
            database: DEFAULT_DB_DATABASE.to_string(),
            purge_on_start: DEFAULT_PURGE_ON_START,
        }
    }
}

impl StoreConfig {
    /// Resolve the database directory against the run's save path.
    pub fn db_path(&self, save_path: &Path) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(path),
            None => save_path.join(DEFAULT_DB_DIR),
        }
    }
}

/// Batch input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Source extensions (without leading dot).
    pub extensions: Vec<String>,

    /// Directory names skipped while walking projects.
    pub exclude_dirs: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Output file configuration. Paths are relative to the save path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Sorted list of unresolved external names.
    pub report_file: String,

    /// JSON dump of extracted elements; disabled when unset.
    pub elements_file: Option<String>,

    /// Callee-first method order; disabled when unset.
    pub method_order_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_file: DEFAULT_REPORT_FILE.to_string(),
            elements_file: Some(DEFAULT_ELEMENTS_FILE.to_string()),
            method_order_file: Some(DEFAULT_METHOD_ORDER_FILE.to_string()),
        }
    }
}

/// Extraction behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Produce one Field/Event element per declarator instead of only the first.
    pub expand_declarators: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            expand_declarators: DEFAULT_EXPAND_DECLARATORS,
        }
    }
}
