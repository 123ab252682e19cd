//! Configuration loading and root folder resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not an error: the importer starts with defaults.
//! A TOML file that exists but cannot be parsed is reported as
//! [`Error::Config`] so a typo never silently turns into defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Application directory name used under the platform config/data dirs
pub const APP_DIR: &str = "poi-import";

/// Environment variable naming an explicit TOML config file
pub const ENV_CONFIG: &str = "POI_CONFIG";

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "POI_ROOT_FOLDER";

/// Environment variable overriding the database file path
pub const ENV_DATABASE: &str = "POI_DATABASE";

/// Database file name created inside the root folder
pub const DEFAULT_DATABASE_FILE: &str = "pois.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database when no explicit path is given
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Path to SQLite database file (relative or absolute)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Import behavior (optional)
    #[serde(default)]
    pub import: ImportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Import configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Log per-batch progress for files split into several batches
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            show_progress: default_show_progress(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_show_progress() -> bool {
    true
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration following the lookup order
    ///
    /// `--config` argument, then `POI_CONFIG`, then the platform config file.
    /// An explicitly named file must exist; the platform file is optional.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Self::load_from(Path::new(&path));
        }

        match default_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Get the first existing default configuration file for the platform
///
/// Checks `<config_dir>/poi-import/config.toml`, then on Linux
/// `/etc/poi-import/config.toml`.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/poi-import (or /var/lib/poi-import for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/poi-import
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\poi-import
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR))
    } else {
        PathBuf::from("./poi_data")
    }
}

/// Root folder resolution: CLI → `POI_ROOT_FOLDER` → TOML → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database path resolution: CLI → `POI_DATABASE` → TOML → `<root>/pois.db`
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    root_folder: &Path,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_DATABASE) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    root_folder.join(DEFAULT_DATABASE_FILE)
}
