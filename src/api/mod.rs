//! API module for HTTP handlers.
//!
//! This module contains route definitions, request validation, and
//! request/response handlers.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod validation;

pub use auth::{AuthenticatedUser, TOKEN_HEADER};
pub use dto::{SuccessResponse, TaskResponse};
pub use error::{ApiError, ApiErrorResponse, TASK_NOT_FOUND, UNAUTHORIZED};
pub use handlers::{
    AppState, HealthResponse, create_task, delete_task, get_task, health_check, update_task,
};
pub use router::build_router;
pub use validation::{Violation, ViolationKind, parse_task_id, validate_update_payload};
