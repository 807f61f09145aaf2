//! Store factory for runtime backend selection.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `SESSION_MODE`: `in_memory` (default) | `redis`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `REDIS_URL`: Redis connection URL (required when `SESSION_MODE=redis`)
//! - `SESSION_TTL_SECONDS`: session lifetime in Redis (default: `86400`)
//!
//! # Example
//!
//! ```ignore
//! let config = RepositoryConfig::from_env()?;
//! let stores = RepositoryFactory::new(config).create().await?;
//! ```

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

use super::{
    InMemorySessionStore, InMemoryTaskRepository, PostgresTaskRepository, RedisSessionStore,
    SessionStore, TaskRepository,
};

/// Default session lifetime: one day.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;

// =============================================================================
// Configuration Types
// =============================================================================

/// Where tasks are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    #[default]
    InMemory,
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ConfigurationError::InvalidStorageMode(value.to_string())),
        }
    }
}

/// Where access tokens are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    InMemory,
    Redis,
}

impl FromStr for SessionMode {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigurationError::InvalidSessionMode(value.to_string())),
        }
    }
}

/// Configuration for the store factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub storage_mode: StorageMode,
    pub session_mode: SessionMode,
    /// Required when `storage_mode` is `Postgres`.
    pub database_url: Option<String>,
    /// Required when `session_mode` is `Redis`.
    pub redis_url: Option<String>,
    pub session_ttl: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            session_mode: SessionMode::default(),
            database_url: None,
            redis_url: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
        }
    }
}

impl RepositoryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::default()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a mode or the TTL is invalid, or a
    /// URL required by the selected modes is missing.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RepositoryConfig::from_env`].
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let storage_mode = non_empty("STORAGE_MODE")
            .map(|value| value.parse::<StorageMode>())
            .transpose()?
            .unwrap_or_default();
        let session_mode = non_empty("SESSION_MODE")
            .map(|value| value.parse::<SessionMode>())
            .transpose()?
            .unwrap_or_default();
        let session_ttl = match non_empty("SESSION_TTL_SECONDS") {
            None => Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            Some(value) => match value.parse::<u64>() {
                Ok(seconds) if seconds > 0 => Duration::from_secs(seconds),
                _ => return Err(ConfigurationError::InvalidSessionTtl(value)),
            },
        };

        let config = Self {
            storage_mode,
            session_mode,
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            session_ttl,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if required URLs are missing for the selected modes.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if matches!(self.storage_mode, StorageMode::Postgres) && self.database_url.is_none() {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }

        if matches!(self.session_mode, SessionMode::Redis) && self.redis_url.is_none() {
            return Err(ConfigurationError::MissingRedisUrl);
        }

        Ok(())
    }
}

/// Builder for `RepositoryConfig`.
#[derive(Debug, Clone, Default)]
pub struct RepositoryConfigBuilder {
    config: RepositoryConfig,
}

impl RepositoryConfigBuilder {
    #[must_use]
    pub const fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.config.storage_mode = mode;
        self
    }

    #[must_use]
    pub const fn session_mode(mut self, mode: SessionMode) -> Self {
        self.config.session_mode = mode;
        self
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_ttl = ttl;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid.
    pub fn build(self) -> Result<RepositoryConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors in store configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    #[error("Invalid session mode: '{0}'. Expected 'in_memory' or 'redis'")]
    InvalidSessionMode(String),

    #[error("Invalid session TTL: '{0}'. Expected a positive number of seconds")]
    InvalidSessionTtl(String),

    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    #[error("REDIS_URL environment variable is required when SESSION_MODE=redis")]
    MissingRedisUrl,
}

/// Errors that can occur during factory initialization.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    #[error("Redis connection error: {0}")]
    RedisConnection(String),
}

// =============================================================================
// Repository Factory
// =============================================================================

/// Initialized stores, shared across request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub task_repository: Arc<dyn TaskRepository + Send + Sync>,
    pub session_store: Arc<dyn SessionStore + Send + Sync>,
}

impl Repositories {
    /// Creates fresh in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            task_repository: Arc::new(InMemoryTaskRepository::new()),
            session_store: Arc::new(InMemorySessionStore::new()),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Repositories")
            .field("task_repository", &"Arc<dyn TaskRepository>")
            .field("session_store", &"Arc<dyn SessionStore>")
            .finish()
    }
}

/// Creates stores according to a [`RepositoryConfig`].
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    config: RepositoryConfig,
}

impl RepositoryFactory {
    #[must_use]
    pub const fn new(config: RepositoryConfig) -> Self {
        Self { config }
    }

    /// Creates a factory from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError::Configuration` if environment configuration is invalid.
    pub fn from_env() -> Result<Self, FactoryError> {
        Ok(Self::new(RepositoryConfig::from_env()?))
    }

    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Connects to the configured backends.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if a required URL is missing or a backend
    /// cannot be reached.
    pub async fn create(&self) -> Result<Repositories, FactoryError> {
        let task_repository: Arc<dyn TaskRepository + Send + Sync> =
            match self.config.storage_mode {
                StorageMode::InMemory => Arc::new(InMemoryTaskRepository::new()),
                StorageMode::Postgres => Arc::new(self.create_postgres_repository().await?),
            };

        let session_store: Arc<dyn SessionStore + Send + Sync> = match self.config.session_mode {
            SessionMode::InMemory => Arc::new(InMemorySessionStore::new()),
            SessionMode::Redis => Arc::new(self.create_redis_session_store()?),
        };

        Ok(Repositories {
            task_repository,
            session_store,
        })
    }

    async fn create_postgres_repository(&self) -> Result<PostgresTaskRepository, FactoryError> {
        let database_url = self
            .config
            .database_url
            .as_ref()
            .ok_or(ConfigurationError::MissingDatabaseUrl)?;

        let pool = PgPool::connect(database_url)
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;

        let repository = PostgresTaskRepository::new(pool);
        repository
            .ensure_schema()
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;
        Ok(repository)
    }

    fn create_redis_session_store(&self) -> Result<RedisSessionStore, FactoryError> {
        let redis_url = self
            .config
            .redis_url
            .as_ref()
            .ok_or(ConfigurationError::MissingRedisUrl)?;

        RedisSessionStore::from_url(redis_url, self.config.session_ttl)
            .map_err(|error| FactoryError::RedisConnection(error.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
