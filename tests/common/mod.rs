//! Common test helpers for integration tests.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::TestFixture;
//! ```
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate. Helpers used only by one test
//! file would otherwise generate dead code warnings in the others.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use task_api::api::{AppState, TOKEN_HEADER, build_router};
use task_api::domain::{AccessToken, Task, TaskChanges, TaskId, Timestamp, User, UserId};
use task_api::infrastructure::{
    InMemorySessionStore, InMemoryTaskRepository, RepositoryFuture, SessionStore, TaskRepository,
};

// =============================================================================
// Counting Repository
// =============================================================================

/// In-memory task repository that counts every call made to it.
#[derive(Default)]
pub struct CountingTaskRepository {
    inner: InMemoryTaskRepository,
    calls: AtomicUsize,
}

impl CountingTaskRepository {
    /// Number of repository calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl TaskRepository for CountingTaskRepository {
    fn find_by_id(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>> {
        self.record();
        self.inner.find_by_id(id, owner_id)
    }

    fn insert(&self, task: &Task) -> RepositoryFuture<()> {
        self.record();
        self.inner.insert(task)
    }

    fn update(
        &self,
        id: &TaskId,
        owner_id: &UserId,
        changes: &TaskChanges,
        now: Timestamp,
    ) -> RepositoryFuture<Option<Task>> {
        self.record();
        self.inner.update(id, owner_id, changes, now)
    }

    fn delete(&self, id: &TaskId, owner_id: &UserId) -> RepositoryFuture<Option<Task>> {
        self.record();
        self.inner.delete(id, owner_id)
    }

    fn clear(&self) -> RepositoryFuture<u64> {
        self.inner.clear()
    }
}

// =============================================================================
// Test Fixture
// =============================================================================

/// Application wired to in-memory stores, plus handles on those stores.
pub struct TestFixture {
    pub state: AppState,
    pub repository: Arc<CountingTaskRepository>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl TestFixture {
    /// Creates a fixture with empty stores.
    pub fn setup() -> Self {
        let repository = Arc::new(CountingTaskRepository::default());
        let sessions = Arc::new(InMemorySessionStore::new());
        let state = AppState {
            task_repository: repository.clone(),
            session_store: sessions.clone(),
        };
        Self {
            state,
            repository,
            sessions,
        }
    }

    /// Empties both stores.
    pub async fn teardown(&self) {
        self.repository.clear().await.unwrap();
        self.sessions.clear().await;
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn create_user(&self) -> User {
        User::new("user@example.com")
    }

    /// Issues an access token for `user`.
    pub async fn login(&self, user: &User) -> AccessToken {
        self.sessions.issue(&user.user_id).await.unwrap()
    }

    /// Stores a task owned by `user` and returns it.
    pub async fn create_task(&self, user: &User) -> Task {
        let task = Task::new(
            TaskId::generate(),
            user.user_id.clone(),
            "original title",
            Timestamp::now(),
        );
        self.repository.insert(&task).await.unwrap();
        task
    }

    /// Reads a task straight from the store, bypassing the API.
    pub async fn stored_task(&self, task: &Task) -> Option<Task> {
        self.repository
            .inner
            .find_by_id(&task.task_id, &task.owner_id)
            .await
            .unwrap()
    }

    /// Sends a request through the router and returns status plus JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

// =============================================================================
// Request Builders
// =============================================================================

/// Builds a request with an optional token and optional JSON body.
pub fn json_request(
    method: Method,
    path: &str,
    token: Option<&AccessToken>,
    body: Option<&Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(TOKEN_HEADER, token.as_str());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

/// `PATCH /tasks/{id}` with the caller's token.
pub fn patch_task(id: &str, token: &AccessToken, body: Option<&Value>) -> Request<Body> {
    json_request(Method::PATCH, &format!("/tasks/{id}"), Some(token), body)
}
