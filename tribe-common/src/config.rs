//! Configuration loading and backend URL resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the backend base URL
pub const BASE_URL_ENV: &str = "TRIBE_BASE_URL";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TRIBE_CONFIG";

/// Environment variable naming the CSRF token
pub const CSRF_TOKEN_ENV: &str = "TRIBE_CSRF_TOKEN";

/// Compiled default backend
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Bootstrap configuration read from `config.toml`
///
/// Every field is optional; missing values fall through to the next source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Backend base URL (e.g. `https://tribe.dev`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// CSRF token sent on mutating requests
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// Where the application-state store lives
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Module-specific tables (e.g. `[viewer]`), left for the module to parse
    #[serde(flatten)]
    pub extra: toml::Table,
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

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Module-specific table, if present
    pub fn section(&self, name: &str) -> Option<&toml::Table> {
        self.extra.get(name).and_then(|v| v.as_table())
    }
}

/// Load the TOML configuration
///
/// An explicitly named file (CLI argument, then `TRIBE_CONFIG`) must exist.
/// The platform default file is optional: if it is missing, defaults are used.
pub fn load_toml_config(cli_path: Option<&Path>) -> Result<TomlConfig> {
    let explicit = cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        debug!("Loaded configuration from {:?}", path);
        return TomlConfig::parse(&text);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(&path)?;
            debug!("Loaded configuration from {:?}", path);
            TomlConfig::parse(&text)
        }
        _ => {
            debug!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the backend base URL
///
/// Trailing slashes are stripped so paths can be appended directly.
pub fn resolve_base_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    let raw = cli_arg
        .map(str::to_string)
        .or_else(|| std::env::var(BASE_URL_ENV).ok())
        .or_else(|| toml_config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    raw.trim_end_matches('/').to_string()
}

/// Resolve the CSRF token (None when no source provides one)
pub fn resolve_csrf_token(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    cli_arg
        .map(str::to_string)
        .or_else(|| std::env::var(CSRF_TOKEN_ENV).ok())
        .or_else(|| toml_config.csrf_token.clone())
        .filter(|token| !token.is_empty())
}

/// Resolve the data directory for the application-state store
pub fn resolve_data_dir(toml_config: &TomlConfig) -> PathBuf {
    if let Some(dir) = &toml_config.data_dir {
        return dir.clone();
    }
    default_data_dir()
}

/// Platform config file location (`~/.config/tribe/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tribe").join("config.toml"))
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("tribe"),
        None => {
            warn!("Could not determine local data directory, using ./tribe_data");
            PathBuf::from("./tribe_data")
        }
    }
}
