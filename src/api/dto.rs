//! Data Transfer Objects for API responses.
//!
//! Request bodies are not deserialized into DTOs; they go through the
//! schemas in [`super::validation`] instead.

use serde::{Deserialize, Serialize};

use crate::domain::{HttpMethod, Task};

/// Successful response envelope: `{ "success": true, "payload": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    /// Always `true`.
    pub success: bool,
    pub payload: T,
}

impl<T> SuccessResponse<T> {
    /// Wraps a payload.
    #[must_use]
    pub const fn new(payload: T) -> Self {
        Self {
            success: true,
            payload,
        }
    }
}

/// Response DTO for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub uri: Option<String>,
    pub method: Option<HttpMethod>,
    /// Owner's user ID.
    pub owner: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.task_id.to_string(),
            title: task.title.clone(),
            uri: task.uri.as_ref().map(|uri| uri.as_str().to_string()),
            method: task.method,
            owner: task.owner_id.to_string(),
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self::from(&task)
    }
}
