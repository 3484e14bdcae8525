/*!
 * Configuration support for the CPSC library
 *
 * Provides runtime configuration options for customizing pipeline behavior,
 * loadable from a TOML file or environment variables.
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Global configuration for the CPSC library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpscConfig {
    /// Whether to show progress bars during long operations
    #[serde(default = "default_enable_progress_bar")]
    pub enable_progress_bar: bool,

    /// Whether to skip malformed CSV rows during parsing
    #[serde(default)]
    pub skip_invalid_records: bool,

    /// Directory holding the raw monthly CSV files
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Directory the JSON artifacts are written to
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for CpscConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: default_enable_progress_bar(),
            skip_invalid_records: false,
            data_dir: None,
            output_dir: None,
        }
    }
}

fn default_enable_progress_bar() -> bool {
    true
}

impl CpscConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `CPSC_PROGRESS_BAR`: "true" or "false"
    /// - `CPSC_SKIP_INVALID`: "true" or "false"
    /// - `CPSC_DATA_DIR`: directory path
    /// - `CPSC_OUTPUT_DIR`: directory path
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CPSC_PROGRESS_BAR") {
            config.enable_progress_bar = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("CPSC_SKIP_INVALID") {
            config.skip_invalid_records = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("CPSC_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("CPSC_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(val));
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents).map_err(|e| crate::CpscError::Configuration {
            message: format!("Failed to parse config file: {}", e),
            suggestion: Some("Check that the file is valid TOML format".to_string()),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| crate::CpscError::Configuration {
            message: format!("Failed to serialize config: {}", e),
            suggestion: None,
        })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/cpsc/config.toml` on Unix-like systems
    /// or `%APPDATA%\cpsc\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "cpsc")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Default config file (if exists)
    /// 2. Environment variables
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::from_file(&config_path) {
                    return config;
                }
            }
        }

        Self::from_env()
    }
}

// Global configuration support
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<Option<CpscConfig>> = RwLock::new(None);
}

/// Set the global configuration
pub fn set_global_config(config: CpscConfig) {
    *GLOBAL_CONFIG.write().unwrap() = Some(config);
}

/// Get the global configuration (or default if not set)
pub fn global_config() -> CpscConfig {
    GLOBAL_CONFIG
        .read()
        .unwrap()
        .clone()
        .unwrap_or_default()
}
