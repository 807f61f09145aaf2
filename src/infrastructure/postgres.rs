//! `PostgreSQL` task repository.
//!
//! Tasks are stored as JSONB documents next to the columns needed for
//! lookups. A partial update locks the row, merges the changes in Rust and
//! writes the document back inside one transaction.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY,
//!     owner_id UUID NOT NULL,
//!     data JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE INDEX idx_tasks_owner_id ON tasks(owner_id);
//! ```

use futures::FutureExt;
use sqlx::PgPool;

use crate::domain::{Task, TaskChanges, TaskId, Timestamp, UserId};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TaskRepository};

const CREATE_TASKS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const CREATE_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_owner_id ON tasks(owner_id)";

#[allow(clippy::needless_pass_by_value)]
fn database_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(error.to_string())
}

fn encode_task(task: &Task) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(task).map_err(|error| RepositoryError::SerializationError(error.to_string()))
}

fn decode_task(data: serde_json::Value) -> Result<Task, RepositoryError> {
    serde_json::from_value(data).map_err(|error| RepositoryError::SerializationError(error.to_string()))
}

/// `PostgreSQL` implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/tasks").await?;
/// let repository = PostgresTaskRepository::new(pool);
/// repository.ensure_schema().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `tasks` table and its index if they are missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if a statement fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_TASKS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        sqlx::query(CREATE_OWNER_INDEX)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }
}

impl TaskRepository for PostgresTaskRepository {
    fn find_by_id(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>> {
        let pool = self.pool.clone();
        let task_id = *id.as_uuid();
        let owner_id = *owner_id.as_uuid();

        async move {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT data FROM tasks WHERE id = $1 AND owner_id = $2")
                    .bind(task_id)
                    .bind(owner_id)
                    .fetch_optional(&pool)
                    .await
                    .map_err(database_error)?;

            row.map(|(data,)| decode_task(data)).transpose()
        }
        .boxed()
    }

    fn insert(&self, task: &Task) -> RepositoryFuture<()> {
        let pool = self.pool.clone();
        let task = task.clone();

        async move {
            let data = encode_task(&task)?;
            let result = sqlx::query(
                "INSERT INTO tasks (id, owner_id, data, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO NOTHING",
            )
            .bind(task.task_id.as_uuid())
            .bind(task.owner_id.as_uuid())
            .bind(&data)
            .bind(task.created_at.as_datetime())
            .bind(task.updated_at.as_datetime())
            .execute(&pool)
            .await
            .map_err(database_error)?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::AlreadyExists(task.task_id.to_string()));
            }
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
        let pool = self.pool.clone();
        let task_id = *id.as_uuid();
        let owner_id = *owner_id.as_uuid();
        let changes = changes.clone();

        async move {
            let mut transaction = pool.begin().await.map_err(database_error)?;

            let row: Option<(serde_json::Value,)> = sqlx::query_as(
                "SELECT data FROM tasks WHERE id = $1 AND owner_id = $2 FOR UPDATE",
            )
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(database_error)?;

            let Some((data,)) = row else {
                transaction.rollback().await.map_err(database_error)?;
                return Ok(None);
            };

            let current = decode_task(data)?;
            if !changes.differs_from(&current) {
                transaction.commit().await.map_err(database_error)?;
                return Ok(Some(current));
            }

            let updated = current.apply_changes(&changes, now);
            let data = encode_task(&updated)?;
            sqlx::query("UPDATE tasks SET data = $2, updated_at = $3 WHERE id = $1")
                .bind(task_id)
                .bind(&data)
                .bind(updated.updated_at.as_datetime())
                .execute(&mut *transaction)
                .await
                .map_err(database_error)?;

            transaction.commit().await.map_err(database_error)?;
            Ok(Some(updated))
        }
        .boxed()
    }

    fn delete(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>> {
        let pool = self.pool.clone();
        let task_id = *id.as_uuid();
        let owner_id = *owner_id.as_uuid();

        async move {
            let row: Option<(serde_json::Value,)> = sqlx::query_as(
                "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING data",
            )
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(&pool)
            .await
            .map_err(database_error)?;

            row.map(|(data,)| decode_task(data)).transpose()
        }
        .boxed()
    }

    fn clear(&self) -> RepositoryFuture<u64> {
        let pool = self.pool.clone();

        async move {
            let result = sqlx::query("DELETE FROM tasks")
                .execute(&pool)
                .await
                .map_err(database_error)?;
            Ok(result.rows_affected())
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, TaskUri};
    use rstest::rstest;

    fn test_task(title: &str) -> Task {
        Task::new(TaskId::generate(), UserId::generate(), title, Timestamp::now())
            .with_uri(TaskUri::parse("https://example.com/run").unwrap())
            .with_method(HttpMethod::Post)
    }

    // -------------------------------------------------------------------------
    // Document Encoding (no DB connection required)
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_encode_decode_task_document() {
        let task = test_task("Encoded");
        let data = encode_task(&task).unwrap();

        assert_eq!(data["title"], "Encoded");
        assert_eq!(data["uri"], "https://example.com/run");
        assert_eq!(data["method"], "post");
        assert_eq!(decode_task(data).unwrap(), task);
    }

    #[rstest]
    fn test_decode_rejects_corrupt_uri() {
        let mut data = encode_task(&test_task("Corrupt")).unwrap();
        data["uri"] = serde_json::json!("not a uri");

        let result = decode_task(data);
        assert!(matches!(result, Err(RepositoryError::SerializationError(_))));
    }

    // -------------------------------------------------------------------------
    // Integration Tests (require PostgreSQL)
    // -------------------------------------------------------------------------

    async fn connect() -> PostgresTaskRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("Failed to connect");
        let repository = PostgresTaskRepository::new(pool);
        repository.ensure_schema().await.expect("Failed to create schema");
        repository
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_insert_update_find() {
        let repository = connect().await;
        let task = test_task("Original");
        repository.insert(&task).await.unwrap();

        let changes = TaskChanges::default().with_title("Updated");
        let updated = repository
            .update(&task.task_id, &task.owner_id, &changes, Timestamp::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Updated");
        assert_eq!(updated.method, Some(HttpMethod::Post));

        let found = repository
            .find_by_id(&task.task_id, &task.owner_id)
            .await
            .unwrap();
        assert_eq!(found, Some(updated));
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_update_other_owner_is_not_found() {
        let repository = connect().await;
        let task = test_task("Owned");
        repository.insert(&task).await.unwrap();

        let changes = TaskChanges::default().with_title("Stolen");
        let result = repository
            .update(&task.task_id, &UserId::generate(), &changes, Timestamp::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_insert_duplicate_fails() {
        let repository = connect().await;
        let task = test_task("Twice");
        repository.insert(&task).await.unwrap();

        let result = repository.insert(&task).await;
        assert!(matches!(result, Err(RepositoryError::AlreadyExists(_))));
    }
}
