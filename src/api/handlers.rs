//! HTTP handlers for the task API.
//!
//! Every task handler checks its input in a fixed order and stops at the
//! first failure:
//!
//! 1. caller identity (`token` header)
//! 2. `id` path parameter
//! 3. request body
//! 4. store lookup
//!
//! Nothing reaches the store until steps 1-3 have passed.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bytes::Bytes;
use serde_json::Value;

use super::auth::AuthenticatedUser;
use super::dto::{SuccessResponse, TaskResponse};
use super::error::ApiErrorResponse;
use super::validation::{parse_task_id, validate_create_payload, validate_update_payload};
use crate::domain::{Task, TaskId, Timestamp};
use crate::infrastructure::{Repositories, SessionStore, TaskRepository};

/// JSON body of every successful task response.
pub type TaskEnvelope = Json<SuccessResponse<TaskResponse>>;

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
///
/// Holds trait objects so the backends chosen by
/// [`RepositoryFactory`](crate::infrastructure::RepositoryFactory) can be
/// swapped at startup.
#[derive(Clone)]
pub struct AppState {
    /// Task persistence.
    pub task_repository: Arc<dyn TaskRepository + Send + Sync>,
    /// Access token resolution.
    pub session_store: Arc<dyn SessionStore + Send + Sync>,
}

impl AppState {
    /// Creates a new `AppState` from initialized repositories.
    #[must_use]
    pub fn from_repositories(repositories: Repositories) -> Self {
        Self {
            task_repository: repositories.task_repository,
            session_store: repositories.session_store,
        }
    }

    /// Creates a state backed by fresh in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repositories(Repositories::in_memory())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("AppState").finish_non_exhaustive()
    }
}

// =============================================================================
// Request Body
// =============================================================================

/// Parses a raw request body as JSON.
///
/// An empty (or whitespace-only) body counts as `{}` so that a bodiless
/// PATCH is a valid no-op.
fn decode_body(body: &Bytes) -> Result<Value, ApiErrorResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_slice(body).map_err(|error| {
        tracing::debug!(%error, "Malformed request body");
        ApiErrorResponse::bad_request("INVALID_JSON", "Invalid JSON payload")
    })
}

// =============================================================================
// POST /tasks Handler
// =============================================================================

/// Creates a task owned by the caller.
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Ping upstream",
///   "uri": "https://example.com/health",
///   "method": "get"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: Task created
/// - **400 Bad Request**: Validation error
/// - **401 Unauthorized**: Missing or unknown token
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] for any of the statuses above, or 500 when
/// the store fails.
pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: Bytes,
) -> Result<(StatusCode, TaskEnvelope), ApiErrorResponse> {
    let fields = validate_create_payload(&decode_body(&body)?)?;

    let mut task = Task::new(TaskId::generate(), user_id, fields.title, Timestamp::now());
    if let Some(uri) = fields.uri {
        task = task.with_uri(uri);
    }
    if let Some(method) = fields.method {
        task = task.with_method(method);
    }

    state.task_repository.insert(&task).await?;

    tracing::info!(task_id = %task.task_id, owner_id = %task.owner_id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(TaskResponse::from(&task))),
    ))
}

// =============================================================================
// GET /tasks/{id} Handler
// =============================================================================

/// Returns one of the caller's tasks.
///
/// # Errors
///
/// - **400 Bad Request**: `id` is not a UUID
/// - **401 Unauthorized**: Missing or unknown token
/// - **404 Not Found**: No such task for this caller
pub async fn get_task(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> Result<TaskEnvelope, ApiErrorResponse> {
    let task_id = parse_task_id(&raw_id)?;

    let task = state
        .task_repository
        .find_by_id(&task_id, &user_id)
        .await?
        .ok_or_else(ApiErrorResponse::task_not_found)?;

    Ok(Json(SuccessResponse::new(TaskResponse::from(&task))))
}

// =============================================================================
// PATCH /tasks/{id} Handler
// =============================================================================

/// Applies a partial update to one of the caller's tasks.
///
/// # Path Parameters
///
/// - `id`: Task UUID
///
/// # Request Body
///
/// Any subset of:
///
/// ```json
/// {
///   "title": "New title",
///   "uri": "https://example.com/v2",
///   "method": "post"
/// }
/// ```
///
/// Fields left out keep their stored value. Sending the same body twice
/// yields the same task both times.
///
/// # Response
///
/// - **200 OK**: `{ "success": true, "payload": <task> }`
/// - **400 Bad Request**: `id` or body failed validation
/// - **401 Unauthorized**: Missing or unknown token
/// - **404 Not Found**: `Task not found`
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] for any of the statuses above, or 500 when
/// the store fails.
pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<TaskEnvelope, ApiErrorResponse> {
    let task_id = parse_task_id(&raw_id)?;
    let changes = validate_update_payload(&decode_body(&body)?)?;

    // Existence check first so a missing task is reported before any write.
    state
        .task_repository
        .find_by_id(&task_id, &user_id)
        .await?
        .ok_or_else(ApiErrorResponse::task_not_found)?;

    let updated = state
        .task_repository
        .update(&task_id, &user_id, &changes, Timestamp::now())
        .await?
        .ok_or_else(ApiErrorResponse::task_not_found)?;

    tracing::info!(task_id = %task_id, "Task updated");

    Ok(Json(SuccessResponse::new(TaskResponse::from(&updated))))
}

// =============================================================================
// DELETE /tasks/{id} Handler
// =============================================================================

/// Deletes one of the caller's tasks and returns it.
///
/// # Errors
///
/// - **400 Bad Request**: `id` is not a UUID
/// - **401 Unauthorized**: Missing or unknown token
/// - **404 Not Found**: No such task for this caller
pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> Result<TaskEnvelope, ApiErrorResponse> {
    let task_id = parse_task_id(&raw_id)?;

    let deleted = state
        .task_repository
        .delete(&task_id, &user_id)
        .await?
        .ok_or_else(ApiErrorResponse::task_not_found)?;

    tracing::info!(task_id = %task_id, "Task deleted");

    Ok(Json(SuccessResponse::new(TaskResponse::from(&deleted))))
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check endpoint.
///
/// Needs no token and never touches the stores.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Tests
// =============================================================================
