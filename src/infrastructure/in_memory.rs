//! In-memory store implementations.
//!
//! Suitable for tests and local development.
//!
//! # Features
//!
//! - Thread-safe with `Arc<RwLock<...>>`
//! - Each partial update runs under a single write lock

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;

use crate::domain::{AccessToken, Task, TaskChanges, TaskId, Timestamp, UserId};
use crate::infrastructure::{RepositoryError, RepositoryFuture, SessionStore, TaskRepository};

// =============================================================================
// In-Memory Task Repository
// =============================================================================

/// In-memory implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let repository = InMemoryTaskRepository::new();
/// let task = Task::new(TaskId::generate(), owner_id.clone(), "My Task", Timestamp::now());
///
/// repository.insert(&task).await?;
/// let found = repository.find_by_id(&task.task_id, &owner_id).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates a new empty in-memory task repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Returns true if no task is stored.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TaskRepository for InMemoryTaskRepository {
    fn find_by_id(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>> {
        let tasks = Arc::clone(&self.tasks);
        let id = id.clone();
        let owner_id = owner_id.clone();
        async move {
            let guard = tasks.read().await;
            Ok(guard
                .get(&id)
                .filter(|task| task.is_owned_by(&owner_id))
                .cloned())
        }
        .boxed()
    }

    fn insert(&self, task: &Task) -> RepositoryFuture<()> {
        let tasks = Arc::clone(&self.tasks);
        let task = task.clone();
        async move {
            let mut guard = tasks.write().await;
            if guard.contains_key(&task.task_id) {
                return Err(RepositoryError::AlreadyExists(task.task_id.to_string()));
            }
            guard.insert(task.task_id.clone(), task);
            Ok(())
        }
        .boxed()
    }

    fn update(
        &self,
        id: &TaskId,
        owner_id: &UserId,
        changes: &TaskChanges,
        now: Timestamp,
    ) -> RepositoryFuture<Option<Task>> {
        let tasks = Arc::clone(&self.tasks);
        let id = id.clone();
        let owner_id = owner_id.clone();
        let changes = changes.clone();
        async move {
            let mut guard = tasks.write().await;
            let Some(slot) = guard
                .get_mut(&id)
                .filter(|task| task.is_owned_by(&owner_id))
            else {
                return Ok(None);
            };

            let updated = slot.clone().apply_changes(&changes, now);
            *slot = updated.clone();
            Ok(Some(updated))
        }
        .boxed()
    }

    fn delete(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>> {
        let tasks = Arc::clone(&self.tasks);
        let id = id.clone();
        let owner_id = owner_id.clone();
        async move {
            let mut guard = tasks.write().await;
            let owned = guard
                .get(&id)
                .is_some_and(|task| task.is_owned_by(&owner_id));
            Ok(if owned { guard.remove(&id) } else { None })
        }
        .boxed()
    }

    fn clear(&self) -> RepositoryFuture<u64> {
        let tasks = Arc::clone(&self.tasks);
        async move {
            let mut guard = tasks.write().await;
            let removed = guard.len() as u64;
            guard.clear();
            Ok(removed)
        }
        .boxed()
    }
}

// =============================================================================
// In-Memory Session Store
// =============================================================================

/// In-memory implementation of `SessionStore`. Tokens never expire.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<AccessToken, UserId>>>,
}

impl InMemorySessionStore {
    /// Creates a new empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every session.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

impl SessionStore for InMemorySessionStore {
    fn issue(&self, user_id: &UserId) -> RepositoryFuture<AccessToken> {
        let sessions = Arc::clone(&self.sessions);
        let user_id = user_id.clone();
        async move {
            let token = AccessToken::generate();
            sessions.write().await.insert(token.clone(), user_id);
            Ok(token)
        }
        .boxed()
    }

    fn resolve(&self, token: &AccessToken) -> RepositoryFuture<Option<UserId>> {
        let sessions = Arc::clone(&self.sessions);
        let token = token.clone();
        async move { Ok(sessions.read().await.get(&token).cloned()) }.boxed()
    }

    fn revoke(&self, token: &AccessToken) -> RepositoryFuture<bool> {
        let sessions = Arc::clone(&self.sessions);
        let token = token.clone();
        async move { Ok(sessions.write().await.remove(&token).is_some()) }.boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
