//! Domain module for task management.
//!
//! This module contains domain models and value objects.

pub mod task;
pub mod user;

pub use task::{HttpMethod, Task, TaskChanges, TaskId, TaskUri, Timestamp, UriError};
pub use user::{AccessToken, User, UserId};
