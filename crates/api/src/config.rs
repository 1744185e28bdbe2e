use std::path::PathBuf;
use std::str::FromStr;

use mdedit_core::file_lock::LOCK_SWEEP_INTERVAL_SECS;

/// Default request body limit for attachment uploads (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running from a checkout.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Root of all persisted files (default: `work`).
    pub work_dir: PathBuf,
    /// SQLite URL of the lock database (default: `sqlite://<WORK_DIR>/locks.db`).
    pub database_url: String,
    /// Frontend assets served for any unmatched path (default: `static`).
    pub static_dir: PathBuf,
    /// JSON list of Basic auth users (default: `users.json`).
    pub users_file: PathBuf,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
    /// Period of the expired-lock sweep in seconds (default: `900`).
    pub lock_sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                        |
    /// |----------------------------|--------------------------------|
    /// | `HOST`                     | `0.0.0.0`                      |
    /// | `PORT`                     | `5000`                         |
    /// | `CORS_ORIGINS`             | `http://localhost:5000`        |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                           |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `10`                           |
    /// | `WORK_DIR`                 | `work`                         |
    /// | `DATABASE_URL`             | `sqlite://<WORK_DIR>/locks.db` |
    /// | `STATIC_DIR`               | `static`                       |
    /// | `USERS_FILE`               | `users.json`                   |
    /// | `MAX_UPLOAD_BYTES`         | `52428800`                     |
    /// | `LOCK_SWEEP_INTERVAL_SECS` | `900`                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse_var("PORT", var("PORT", "5000"))?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs =
            parse_var("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS", "30"))?;
        let shutdown_timeout_secs =
            parse_var("SHUTDOWN_TIMEOUT_SECS", var("SHUTDOWN_TIMEOUT_SECS", "10"))?;

        let work_dir = PathBuf::from(var("WORK_DIR", "work"));
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite://{}", work_dir.join("locks.db").display()));

        let static_dir = PathBuf::from(var("STATIC_DIR", "static"));
        let users_file = PathBuf::from(var("USERS_FILE", "users.json"));

        let max_upload_bytes = parse_var(
            "MAX_UPLOAD_BYTES",
            var("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string()),
        )?;
        let lock_sweep_interval_secs: u64 = parse_var(
            "LOCK_SWEEP_INTERVAL_SECS",
            var("LOCK_SWEEP_INTERVAL_SECS", &LOCK_SWEEP_INTERVAL_SECS.to_string()),
        )?;
        if lock_sweep_interval_secs == 0 {
            return Err(ConfigError {
                var: "LOCK_SWEEP_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            work_dir,
            database_url,
            static_dir,
            users_file,
            max_upload_bytes,
            lock_sweep_interval_secs,
        })
    }

    /// Directory holding `.md` documents and their sidecars.
    pub fn documents_dir(&self) -> PathBuf {
        self.work_dir.join("documents")
    }

    /// Directory holding uploaded attachments.
    pub fn attachments_dir(&self) -> PathBuf {
        self.work_dir.join("attachments")
    }
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
