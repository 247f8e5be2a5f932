//! Bootstrap configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PWZ_ROOT_FOLDER";

/// Environment variable pointing at an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "PWZ_CONFIG";

/// Default listen address for the drafts service
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5790";

/// Default SQLite file name inside the root folder
pub const DEFAULT_DATABASE_FILE: &str = "drafts.db";

/// Which `DocumentStore` backend the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// What to do when a caller's expected version is older than the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StaleClientPolicy {
    /// Merge the caller's sections onto the current document
    #[default]
    Remerge,
    /// Reject with a version conflict and let the caller reload
    Reject,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is not set
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Reconciliation engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub storage: StorageBackend,
    /// Total persist attempts per save before `ConflictExceeded`
    pub max_conflict_attempts: u32,
    pub stale_client_policy: StaleClientPolicy,
    /// Upper bound on a single storage call
    pub storage_timeout_ms: u64,
    /// Total backoff budget for transient storage failures
    pub storage_retry_max_wait_ms: u64,
    pub event_bus_capacity: usize,
    pub allow_unknown_sections: bool,
    pub max_section_depth: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Sqlite,
            max_conflict_attempts: 3,
            stale_client_policy: StaleClientPolicy::Remerge,
            storage_timeout_ms: 5000,
            storage_retry_max_wait_ms: 1000,
            event_bus_capacity: 256,
            allow_unknown_sections: true,
            max_section_depth: 32,
        }
    }
}

/// Contents of `pwz-drafts.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub bind_addr: Option<String>,
    #[serde(default)]
    pub database_file: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load configuration with graceful degradation
    ///
    /// An explicit path (CLI or `PWZ_CONFIG`) that cannot be parsed is an
    /// error; a missing default file only logs a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from));

        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::from_file(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                match Self::from_file(&path) {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        warn!("Ignoring unreadable config {}: {}", path.display(), e);
                        Ok(Self::default())
                    }
                }
            }
            _ => {
                warn!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Default configuration file location (`~/.config/pwz/pwz-drafts.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pwz").join("pwz-drafts.toml"))
}

/// Resolve the root folder holding the database
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pwz"))
        .unwrap_or_else(|| PathBuf::from("./pwz_data"))
}

/// Resolve the listen address (CLI > TOML > default)
pub fn resolve_bind_addr(cli_arg: Option<&str>, toml: &TomlConfig) -> String {
    cli_arg
        .map(str::to_string)
        .or_else(|| toml.bind_addr.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}

/// Database path inside the resolved root folder
pub fn database_path(root_folder: &Path, toml: &TomlConfig) -> PathBuf {
    root_folder.join(
        toml.database_file
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_FILE),
    )
}
