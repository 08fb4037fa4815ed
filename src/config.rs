//! Configuration management for lanshare
//!
//! Handles loading and saving configuration from ~/.config/lanshare/config.toml
//! and layering it under CLI flags and the `FILE_TRANSFER_DIR` environment
//! variable.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application name for config directory
const APP_NAME: &str = "lanshare";

/// Environment variable overriding the shared directory
pub const SHARED_DIR_ENV: &str = "FILE_TRANSFER_DIR";

/// Directory under the home directory shared when nothing else is configured
pub const DEFAULT_SHARED_DIR_NAME: &str = "file_transfer";

/// Port used when neither the CLI nor the config file set one
pub const DEFAULT_PORT: u16 = 3001;

/// Address used when neither the CLI nor the config file set one
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED);

/// Seconds a directory archive is kept after its download finished
pub const DEFAULT_CLEANUP_DELAY_SECS: u64 = 60;

/// Keys accepted by `lanshare config set` / `unset`
pub const CONFIG_KEYS: [&str; 5] = [
    "shared_dir",
    "port",
    "bind",
    "cleanup_delay_secs",
    "open_browser",
];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine home directory; set FILE_TRANSFER_DIR or --dir")]
    NoHomeDir,

    #[error("Unknown config key: {0} (expected one of: {keys})", keys = CONFIG_KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load a `.env` file from the working directory or one of its parents.
///
/// Variables already set in the process environment are kept. Returns the
/// path of the file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    report_dotenv(dotenvy::dotenv())
}

/// Load a specific `.env` file, keeping variables that are already set.
pub fn load_dotenv_from(path: &Path) -> Option<PathBuf> {
    report_dotenv(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn report_dotenv(result: Result<PathBuf, dotenvy::Error>) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded environment file");
            Some(path)
        }
        Err(e) if e.not_found() => {
            debug!("No .env file found");
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to load .env file");
            None
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Directory to share
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_dir: Option<PathBuf>,

    /// Port for the web server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Address to bind the web server to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<IpAddr>,

    /// Seconds to keep directory archives after the download finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup_delay_secs: Option<u64>,

    /// Open the browser when the server starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_browser: Option<bool>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path
    ///
    /// Returns ~/.config/lanshare/config.toml on Linux
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Get the config directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    ///
    /// Creates the parent directory if it doesn't exist
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check if any configuration is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set a key from its string form, as given on the command line
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "shared_dir" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.shared_dir = Some(PathBuf::from(value));
            }
            "port" => self.port = Some(value.parse().map_err(|_| invalid())?),
            "bind" => self.bind = Some(value.parse().map_err(|_| invalid())?),
            "cleanup_delay_secs" => {
                self.cleanup_delay_secs = Some(value.parse().map_err(|_| invalid())?)
            }
            "open_browser" => self.open_browser = Some(value.parse().map_err(|_| invalid())?),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Clear a key so the built-in default applies again
    pub fn unset(&mut self, key: &str) -> ConfigResult<()> {
        match key {
            "shared_dir" => self.shared_dir = None,
            "port" => self.port = None,
            "bind" => self.bind = None,
            "cleanup_delay_secs" => self.cleanup_delay_secs = None,
            "open_browser" => self.open_browser = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Get the directory to share
    ///
    /// Precedence: CLI flag, then `FILE_TRANSFER_DIR`, then the config file,
    /// then `~/file_transfer`.
    pub fn effective_shared_dir(
        &self,
        cli_dir: Option<PathBuf>,
        env_dir: Option<OsString>,
    ) -> ConfigResult<PathBuf> {
        if let Some(dir) = cli_dir {
            return Ok(dir);
        }
        if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.shared_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(DEFAULT_SHARED_DIR_NAME))
    }

    /// Get effective port (CLI, then config, then default)
    pub fn effective_port(&self, cli_port: Option<u16>) -> u16 {
        cli_port.or(self.port).unwrap_or(DEFAULT_PORT)
    }

    /// Get effective bind address (CLI, then config, then default)
    pub fn effective_bind(&self, cli_bind: Option<IpAddr>) -> IpAddr {
        cli_bind.or(self.bind).unwrap_or(DEFAULT_BIND)
    }

    /// Get effective archive cleanup delay (CLI, then config, then default)
    pub fn effective_cleanup_delay(&self, cli_secs: Option<u64>) -> Duration {
        Duration::from_secs(
            cli_secs
                .or(self.cleanup_delay_secs)
                .unwrap_or(DEFAULT_CLEANUP_DELAY_SECS),
        )
    }

    /// Whether to open the browser (the CLI flag can only turn it on)
    pub fn effective_open_browser(&self, cli_open: bool) -> bool {
        cli_open || self.open_browser.unwrap_or(false)
    }
}

/// Format the configuration for display
pub fn format_config(config: &Config) -> String {
    let mut lines = Vec::new();

    lines.push("Current configuration:".to_string());
    lines.push(String::new());

    match config.shared_dir {
        Some(ref dir) => lines.push(format!("  shared_dir = \"{}\"", dir.display())),
        None => lines.push(format!(
            "  shared_dir = (not set, using ${} or ~/{})",
            SHARED_DIR_ENV, DEFAULT_SHARED_DIR_NAME
        )),
    }

    match config.port {
        Some(port) => lines.push(format!("  port = {}", port)),
        None => lines.push(format!("  port = (not set, using {})", DEFAULT_PORT)),
    }

    match config.bind {
        Some(bind) => lines.push(format!("  bind = \"{}\"", bind)),
        None => lines.push(format!("  bind = (not set, using {})", DEFAULT_BIND)),
    }

    match config.cleanup_delay_secs {
        Some(secs) => lines.push(format!("  cleanup_delay_secs = {}", secs)),
        None => lines.push(format!(
            "  cleanup_delay_secs = (not set, using {})",
            DEFAULT_CLEANUP_DELAY_SECS
        )),
    }

    match config.open_browser {
        Some(open) => lines.push(format!("  open_browser = {}", open)),
        None => lines.push("  open_browser = (not set, using false)".to_string()),
    }

    lines.join("\n")
}
