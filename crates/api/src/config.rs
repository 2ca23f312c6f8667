use std::str::FromStr;

use pilelog_engine::{EngineConfig, DEFAULT_MAX_BATCH};

use crate::auth::jwt::{JwtConfig, DEFAULT_ACCESS_EXPIRY_MINS};

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Log output format of the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Sync protocol tunables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum changes accepted in one push (default: `500`).
    pub max_batch: usize,
    /// Whether sync UPDATE/DELETE obey the interactive edit lock (default: `false`).
    pub enforce_edit_lock: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
            enforce_edit_lock: false,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    pub sync: SyncConfig,
    pub log_format: LogFormat,
}

fn var_or(var: &'static str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(var: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(var, default);
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `JWT_SECRET`             | required                |
    /// | `JWT_ACCESS_EXPIRY_MINS` | `15`                    |
    /// | `SYNC_MAX_BATCH`         | `500`                   |
    /// | `SYNC_ENFORCE_EDIT_LOCK` | `false`                 |
    /// | `LOG_FORMAT`             | `text`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let cors_origins: Vec<String> = var_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let max_batch: usize = parse_var("SYNC_MAX_BATCH", &DEFAULT_MAX_BATCH.to_string())?;
        if max_batch == 0 {
            return Err(ConfigError::Invalid {
                var: "SYNC_MAX_BATCH",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "3000")?,
            cors_origins,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30")?,
            jwt: JwtConfig {
                secret,
                access_token_expiry_mins: parse_var(
                    "JWT_ACCESS_EXPIRY_MINS",
                    &DEFAULT_ACCESS_EXPIRY_MINS.to_string(),
                )?,
            },
            sync: SyncConfig {
                max_batch,
                enforce_edit_lock: parse_var("SYNC_ENFORCE_EDIT_LOCK", "false")?,
            },
            log_format: parse_var("LOG_FORMAT", "text")?,
        })
    }

    /// Engine tunables derived from the sync settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_batch: self.sync.max_batch,
            enforce_edit_lock: self.sync.enforce_edit_lock,
        }
    }
}
