//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `smartcode.toml` in the working directory unless a path is
//! given on the command line. Every field has a sensible default so the
//! file is optional. Environment variables take precedence over file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Config file read when no `--config` is given.
pub const DEFAULT_PATH: &str = "smartcode.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Where devices, users, shares and schedules are kept.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Background schedule evaluation.
    pub scheduler: SchedulerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `SQLite` database through sqlx.
    #[default]
    Sqlite,
    /// Legacy-compatible JSON files in a data directory.
    Json,
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown storage backend {other:?}"
            ))),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    /// `SQLite` connection URL, used by the `sqlite` backend.
    pub database_url: String,
    /// Directory holding the JSON files, used by the `json` backend.
    pub data_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Also append plain-text logs to this file.
    pub file: Option<PathBuf>,
}

/// Schedule runner configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the schedule runner next to the HTTP server.
    pub enabled: bool,
    /// Seconds between two evaluations.
    pub interval_secs: u64,
    /// Drop expired schedules on every tick.
    pub cleanup_expired: bool,
}

impl Config {
    /// Load configuration from `path` (or `smartcode.toml` if present) then
    /// apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file is malformed, an explicitly
    /// requested file is missing, an override cannot be parsed, or the
    /// result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path, true)?,
            None => Self::from_file(Path::new(DEFAULT_PATH), false)?,
        };
        config.apply_env_overrides_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply `SMARTCODE_*` overrides looked up through `lookup`.
    fn apply_env_overrides_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        fn parsed<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        if let Some(val) = lookup("SMARTCODE_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("SMARTCODE_PORT") {
            self.server.port = parsed("SMARTCODE_PORT", &val)?;
        }
        if let Some(val) = lookup("SMARTCODE_BIND") {
            let (host, port) = val.rsplit_once(':').ok_or_else(|| ConfigError::Env {
                key: "SMARTCODE_BIND".to_string(),
                value: val.clone(),
            })?;
            self.server.port = parsed("SMARTCODE_BIND", port)?;
            self.server.host = host.to_string();
        }
        if let Some(val) = lookup("SMARTCODE_STORAGE") {
            self.storage.backend = val.parse()?;
        }
        if let Some(val) = lookup("SMARTCODE_DATABASE_URL") {
            self.storage.database_url = val;
        }
        if let Some(val) = lookup("SMARTCODE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("SMARTCODE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("SMARTCODE_LOG_FILE") {
            self.logging.file = Some(val).filter(|v| !v.is_empty()).map(PathBuf::from);
        }
        if let Some(val) = lookup("SMARTCODE_SCHEDULER") {
            self.scheduler.enabled = parsed("SMARTCODE_SCHEDULER", &val)?;
        }
        if let Some(val) = lookup("SMARTCODE_SCHEDULE_INTERVAL") {
            self.scheduler.interval_secs = parsed("SMARTCODE_SCHEDULE_INTERVAL", &val)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler interval must be at least one second".to_string(),
            ));
        }
        match self.storage.backend {
            Backend::Sqlite if self.storage.database_url.trim().is_empty() => Err(
                ConfigError::Validation("database_url must not be empty".to_string()),
            ),
            Backend::Json if self.storage.data_dir.as_os_str().is_empty() => Err(
                ConfigError::Validation("data_dir must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database_url: "sqlite:smartcode.db?mode=rwc".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "smartcoded=info,smartcode=info,tower_http=debug".to_string(),
            file: None,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            cleanup_expired: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    Env { key: String, value: String },
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
