//! Application configuration module.
//!
//! Runtime settings for the extraction binary and batch runner. Configuration
//! is loaded from a JSON file; every field has a default so a partial file is
//! accepted.

use super::error::ConfigError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/app_config.json";

/// Global configuration instance
static CONFIG_INSTANCE: OnceCell<AppConfig> = OnceCell::new();

/// Application configuration structure.
///
/// String fields use `Box<str>` since they are set once and never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name or path of the tesseract executable
    pub tesseract_command: Box<str>,

    /// Optional tessdata directory passed to tesseract via `--tessdata-dir`
    pub tessdata_dir: Option<Box<str>>,

    /// Number of batch workers; `None` uses one worker per logical CPU
    pub worker_count: Option<usize>,

    /// Capacity of the bounded batch task queue
    pub queue_capacity: usize,

    /// Minimum number of page images a document directory must contain
    pub min_page_count: usize,
}

impl AppConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration JSON file
    ///
    /// # Returns
    ///
    /// Returns the parsed `AppConfig` or a `ConfigError` if loading fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default path.
    ///
    /// This loads configuration from `config/app_config.json`.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_file(DEFAULT_CONFIG_PATH)
    }

    /// Initialize the global configuration instance.
    ///
    /// Reads `path` when given, otherwise the default path. A missing default
    /// file falls back to default values; an explicitly requested file must
    /// exist.
    ///
    /// # Returns
    ///
    /// Returns a reference to the initialized configuration.
    pub fn init(path: Option<&Path>) -> Result<&'static Self, ConfigError> {
        CONFIG_INSTANCE.get_or_try_init(|| match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_default(),
            None => Ok(Self::default_config()),
        })
    }

    /// Create a new configuration with default values.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            tesseract_command: "tesseract".into(),
            tessdata_dir: None,
            worker_count: None,
            queue_capacity: 64,
            min_page_count: 8,
        }
    }

    /// Number of workers the batch runner should start.
    ///
    /// Falls back to the logical CPU count when unset or zero.
    #[must_use]
    pub fn effective_worker_count(&self) -> usize {
        match self.worker_count {
            Some(count) if count > 0 => count,
            _ => num_cpus::get().max(1),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
