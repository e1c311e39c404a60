//! Configuration system for the `Taskpad` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskpad/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

pub mod command;

pub use command::Command;

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::cache::JsonFileCache;
use crate::reminder::{RefirePolicy, ReminderConfig};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The configured service URL is not a valid URL.
    #[error("invalid service url '{url}': {source}")]
    InvalidUrl {
        /// The rejected value.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    remote: RemoteFileConfig,
    reminders: ReminderFileConfig,
    cache: CacheFileConfig,
}

/// `[remote]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemoteFileConfig {
    base_url: Option<String>,
    user_id: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[reminders]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ReminderFileConfig {
    poll_interval_secs: Option<u64>,
    lead_window_secs: Option<u64>,
    refire: Option<RefirePolicy>,
}

/// `[cache]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CacheFileConfig {
    path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Remote --
    /// Root URL of the task service. `None` selects local mode.
    pub base_url: Option<String>,
    /// User the client acts for.
    pub user_id: String,
    /// Per-request timeout for the task service.
    pub request_timeout: Duration,

    // -- Reminders --
    /// Reminder scheduler settings.
    pub reminders: ReminderConfig,

    // -- Cache --
    /// Snapshot file of the last known collection. `None` disables caching.
    pub cache_path: Option<PathBuf>,

    // -- Logging --
    /// Log level filter string.
    pub log_level: String,
    /// Log file path.
    pub log_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_id: "local".to_string(),
            request_timeout: Duration::from_secs(30),
            reminders: ReminderConfig::default(),
            cache_path: JsonFileCache::default_path(),
            log_level: "info".to_string(),
            log_file: std::env::temp_dir().join("taskpad.log"),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path
    /// (`~/.config/taskpad/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default. Separated from `load()` for testing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            base_url: cli
                .base_url
                .clone()
                .or_else(|| file.remote.base_url.clone())
                .filter(|url| !url.trim().is_empty()),
            user_id: cli
                .user
                .clone()
                .or_else(|| file.remote.user_id.clone())
                .unwrap_or(defaults.user_id),
            request_timeout: file
                .remote
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            reminders: ReminderConfig {
                poll_interval: file
                    .reminders
                    .poll_interval_secs
                    .map_or(defaults.reminders.poll_interval, Duration::from_secs),
                lead_window: file
                    .reminders
                    .lead_window_secs
                    .map_or(defaults.reminders.lead_window, Duration::from_secs),
                refire: cli
                    .refire
                    .or(file.reminders.refire)
                    .unwrap_or(defaults.reminders.refire),
            },
            cache_path: cli
                .cache
                .clone()
                .or_else(|| file.cache.path.clone())
                .or(defaults.cache_path),
            log_level: if cli.log_level.is_empty() {
                defaults.log_level
            } else {
                cli.log_level.clone()
            },
            log_file: cli.log_file.clone().unwrap_or(defaults.log_file),
        }
    }

    /// Parses the service URL, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the value does not parse.
    pub fn service_url(&self) -> Result<Option<Url>, ConfigError> {
        self.base_url
            .as_deref()
            .map(|url| {
                Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
                    url: url.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task tracker")]
pub struct CliArgs {
    /// Root URL of the task service; local mode when unset.
    #[arg(long, env = "TASKPAD_URL")]
    pub base_url: Option<String>,

    /// User id to act as.
    #[arg(long, env = "TASKPAD_USER")]
    pub user: Option<String>,

    /// Reminder re-fire policy (once, every-tick).
    #[arg(long)]
    pub refire: Option<RefirePolicy>,

    /// Path to the task cache file.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Path to config file (default: `~/.config/taskpad/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKPAD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskpad.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do; lists tasks when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskpad").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
