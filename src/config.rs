//! Server configuration.
//!
//! # Environment Variables
//!
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)
//! - `WORKER_THREADS`: Number of tokio worker threads (default: logical CPU count)
//! - `LOG_FORMAT`: `pretty` (default) | `json`
//!
//! Store selection lives in [`RepositoryConfig`](crate::infrastructure::RepositoryConfig).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Errors raised while reading server settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerConfigError {
    #[error("Invalid PORT: {0}")]
    InvalidPort(String),

    #[error("Invalid WORKER_THREADS: {0} (must be a positive integer)")]
    InvalidWorkerThreads(String),

    #[error("Invalid LOG_FORMAT: {0} (expected pretty or json)")]
    InvalidLogFormat(String),

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ServerConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ServerConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Settings for the HTTP listener and runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` keeps the tokio default.
    pub worker_threads: Option<usize>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            worker_threads: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Reads settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ServerConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings from an arbitrary variable lookup.
    ///
    /// `WORKER_THREADS` above four times the logical CPU count is capped.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ServerConfigError> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_empty("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ServerConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };
        let worker_threads = match non_empty("WORKER_THREADS") {
            Some(value) => match value.parse::<usize>() {
                Ok(0) | Err(_) => return Err(ServerConfigError::InvalidWorkerThreads(value)),
                Ok(threads) => Some(threads.min(max_worker_threads())),
            },
            None => None,
        };
        let log_format = non_empty("LOG_FORMAT")
            .map(|value| value.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            worker_threads,
            log_format,
        })
    }

    /// Resolves the listen address.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if `host:port` is not a socket address.
    pub fn socket_address(&self) -> Result<SocketAddr, ServerConfigError> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .parse()
            .map_err(|_| ServerConfigError::InvalidAddress(address))
    }
}

fn max_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|parallelism| parallelism.get().saturating_mul(4))
        .unwrap_or(64)
}
