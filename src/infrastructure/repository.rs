//! Store traits for tasks and sessions.
//!
//! Every method returns a boxed `'static` future so the traits stay
//! object-safe and can be shared as `Arc<dyn ...>` in the application state.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{AccessToken, Task, TaskChanges, TaskId, Timestamp, UserId};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// An entity with the same identifier already exists.
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Session store error.
    #[error("Session store error: {0}")]
    SessionError(String),
}

/// Future returned by store operations.
pub type RepositoryFuture<T> = BoxFuture<'static, Result<T, RepositoryError>>;

// =============================================================================
// Task Repository
// =============================================================================

/// Key-addressed task storage.
///
/// Reads and writes are scoped to an owner: a task owned by someone else is
/// indistinguishable from a missing one.
pub trait TaskRepository: Send + Sync {
    /// Finds a task by its ID.
    ///
    /// Returns `Ok(None)` if no task with this ID belongs to `owner_id`.
    fn find_by_id(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>>;

    /// Inserts a new task.
    ///
    /// Fails with `RepositoryError::AlreadyExists` if the ID is taken.
    fn insert(&self, task: &Task) -> RepositoryFuture<()>;

    /// Applies a partial update to a single task atomically.
    ///
    /// Returns the updated task, or `Ok(None)` if it does not exist for
    /// `owner_id`. Concurrent updates to the same task are last-write-wins.
    fn update(
        &self,
        id: &TaskId,
        owner_id: &UserId,
        changes: &TaskChanges,
        now: Timestamp,
    ) -> RepositoryFuture<Option<Task>>;

    /// Deletes a task and returns it, or `Ok(None)` if it did not exist.
    fn delete(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>>;

    /// Removes every task and returns how many were removed.
    fn clear(&self) -> RepositoryFuture<u64>;
}

// =============================================================================
// Session Store
// =============================================================================

/// Maps access tokens to user identities.
pub trait SessionStore: Send + Sync {
    /// Issues a new token for `user_id`.
    fn issue(&self, user_id: &UserId) -> RepositoryFuture<AccessToken>;

    /// Resolves a token to its user, or `Ok(None)` if unknown or expired.
    fn resolve(&self, token: &AccessToken) -> RepositoryFuture<Option<UserId>>;

    /// Revokes a token. Returns `Ok(true)` if it existed.
    fn revoke(&self, token: &AccessToken) -> RepositoryFuture<bool>;
}
