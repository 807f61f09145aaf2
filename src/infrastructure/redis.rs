//! Redis session store.
//!
//! Sessions are shared with the authentication service that issues them.
//!
//! # Key Design
//!
//! - Session: `session:{token}` -> user id, expiring after the session TTL

use std::time::Duration;

use deadpool_redis::{Config, Pool, Runtime};
use futures::FutureExt;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::{AccessToken, UserId};
use crate::infrastructure::{RepositoryError, RepositoryFuture, SessionStore};

/// Prefix for session keys.
const SESSION_KEY_PREFIX: &str = "session:";

/// Generates a Redis key for a session.
fn session_key(token: &AccessToken) -> String {
    format!("{SESSION_KEY_PREFIX}{}", token.as_str())
}

#[allow(clippy::needless_pass_by_value)]
fn session_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::SessionError(error.to_string())
}

/// Redis implementation of `SessionStore`.
///
/// # Example
///
/// ```ignore
/// let store = RedisSessionStore::from_url("redis://localhost:6379", Duration::from_secs(3600))?;
/// let token = store.issue(&user_id).await?;
/// ```
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: Pool,
    ttl: Duration,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RedisSessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedisSessionStore {
    /// Creates a session store with the given connection pool and TTL.
    #[must_use]
    pub const fn new(pool: Pool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Creates a session store from a Redis URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::SessionError` if the pool cannot be created.
    pub fn from_url(redis_url: &str, ttl: Duration) -> Result<Self, RepositoryError> {
        let config = Config::from_url(redis_url);
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(session_error)?;
        Ok(Self { pool, ttl })
    }

    /// Returns the session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl SessionStore for RedisSessionStore {
    fn issue(&self, user_id: &UserId) -> RepositoryFuture<AccessToken> {
        let pool = self.pool.clone();
        let value = user_id.to_string();
        let ttl = self.ttl.as_secs().max(1);

        async move {
            let token = AccessToken::generate();
            let mut connection = pool.get().await.map_err(session_error)?;
            let () = connection
                .set_ex(session_key(&token), value, ttl)
                .await
                .map_err(session_error)?;
            Ok(token)
        }
        .boxed()
    }

    fn resolve(&self, token: &AccessToken) -> RepositoryFuture<Option<UserId>> {
        let pool = self.pool.clone();
        let key = session_key(token);

        async move {
            let mut connection = pool.get().await.map_err(session_error)?;
            let value: Option<String> = connection.get(&key).await.map_err(session_error)?;

            match value {
                None => Ok(None),
                Some(raw) => Uuid::try_parse(&raw)
                    .map(|uuid| Some(UserId::from_uuid(uuid)))
                    .map_err(|error| RepositoryError::SerializationError(error.to_string())),
            }
        }
        .boxed()
    }

    fn revoke(&self, token: &AccessToken) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let key = session_key(token);

        async move {
            let mut connection = pool.get().await.map_err(session_error)?;
            let removed: u64 = connection.del(&key).await.map_err(session_error)?;
            Ok(removed > 0)
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
