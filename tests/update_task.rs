//! Integration tests for `PATCH /tasks/{id}`.
//!
//! Requests go through the full router, including the token extractor.

mod common;

use axum::http::{Method, StatusCode};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use common::{TestFixture, json_request, patch_task};
use task_api::domain::{AccessToken, Task, TaskId, User};

struct Context {
    fixture: TestFixture,
    user: User,
    token: AccessToken,
    task: Task,
}

#[fixture]
async fn context() -> Context {
    let fixture = TestFixture::setup();
    let user = fixture.create_user();
    let token = fixture.login(&user).await;
    let task = fixture.create_task(&user).await;
    Context {
        fixture,
        user,
        token,
        task,
    }
}

fn reversed(value: &str) -> String {
    value.chars().rev().collect()
}

// =============================================================================
// Validation Failures
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_fails_when_invalid_id_is_sent(#[future] context: Context) {
    let context = context.await;

    let (status, body) = context
        .fixture
        .send(patch_task("1", &context.token, None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "\"id\" is not a valid uuid");
    context.fixture.teardown().await;
}

#[rstest]
#[tokio::test]
async fn test_fails_when_task_is_not_found(#[future] context: Context) {
    let context = context.await;
    let id = reversed(&context.task.task_id.as_uuid().simple().to_string());

    let (status, body) = context
        .fixture
        .send(patch_task(&id, &context.token, None))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Task not found");
    context.fixture.teardown().await;
}

#[rstest]
#[tokio::test]
async fn test_reversed_hyphenated_id_is_not_a_uuid(#[future] context: Context) {
    let context = context.await;
    let id = reversed(&context.task.task_id.to_string());

    let (status, body) = context
        .fixture
        .send(patch_task(&id, &context.token, None))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "\"id\" is not a valid uuid");
}

#[rstest]
#[case(json!({ "uri": "uri" }), "\"uri\" must be a valid uri")]
#[case(
    json!({ "method": "method" }),
    "\"method\" must be one of [get, post, put, patch, delete]"
)]
#[case(json!({ "method": "GET" }), "\"method\" must be one of [get, post, put, patch, delete]")]
#[case(json!({ "method": 5 }), "\"method\" must be one of [get, post, put, patch, delete]")]
#[case(json!({ "method": null }), "\"method\" must be one of [get, post, put, patch, delete]")]
#[case(json!({ "uri": "https://example.com/a b" }), "\"uri\" must be a valid uri")]
#[case(json!({ "uri": "http:example.com" }), "\"uri\" must be a valid uri")]
#[case(json!({ "uri": "https:\\\\example.com\\x" }), "\"uri\" must be a valid uri")]
#[case(json!({ "uri": "http://example.com/<script>" }), "\"uri\" must be a valid uri")]
#[case(json!({ "title": "" }), "\"title\" is not allowed to be empty")]
#[case(json!({ "title": 7 }), "\"title\" must be a string")]
#[case(json!({ "owner": "someone" }), "\"owner\" is not allowed")]
#[case(json!([]), "\"value\" must be of type object")]
#[tokio::test]
async fn test_fails_when_body_is_invalid(
    #[future] context: Context,
    #[case] body: Value,
    #[case] message: &str,
) {
    let context = context.await;

    let (status, response) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &context.token,
            Some(&body),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["message"], message);
}

#[rstest]
#[tokio::test]
async fn test_reports_first_violation_only(#[future] context: Context) {
    let context = context.await;
    let body = json!({ "method": "method", "uri": "uri" });

    let (_, response) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &context.token,
            Some(&body),
        ))
        .await;

    assert_eq!(response["message"], "\"uri\" must be a valid uri");
}

#[rstest]
#[tokio::test]
async fn test_invalid_id_wins_over_invalid_body(#[future] context: Context) {
    let context = context.await;
    let body = json!({ "uri": "uri" });

    let (_, response) = context
        .fixture
        .send(patch_task("1", &context.token, Some(&body)))
        .await;

    assert_eq!(response["message"], "\"id\" is not a valid uuid");
}

#[rstest]
#[tokio::test]
async fn test_fails_on_malformed_json(#[future] context: Context) {
    let context = context.await;
    let request = axum::http::Request::builder()
        .method(Method::PATCH)
        .uri(format!("/tasks/{}", context.task.task_id))
        .header(task_api::api::TOKEN_HEADER, context.token.as_str())
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"title\":"))
        .unwrap();

    let (status, response) = context.fixture.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Invalid JSON payload");
}

// =============================================================================
// Fail Fast
// =============================================================================

#[rstest]
#[case("1", json!({ "title": "new title" }))]
#[case("", json!({ "uri": "uri" }))]
#[case("", json!({ "method": "method" }))]
#[tokio::test]
async fn test_invalid_requests_never_reach_the_store(
    #[future] context: Context,
    #[case] id: &str,
    #[case] body: Value,
) {
    let context = context.await;
    let id = if id.is_empty() {
        context.task.task_id.to_string()
    } else {
        id.to_string()
    };
    let calls_before = context.fixture.repository.calls();

    let (status, _) = context
        .fixture
        .send(patch_task(&id, &context.token, Some(&body)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(context.fixture.repository.calls(), calls_before);
}

#[rstest]
#[tokio::test]
async fn test_invalid_request_leaves_task_unchanged(#[future] context: Context) {
    let context = context.await;
    let body = json!({ "title": "new title", "method": "method" });

    context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &context.token,
            Some(&body),
        ))
        .await;

    let stored = context.fixture.stored_task(&context.task).await.unwrap();
    assert_eq!(stored, context.task);
}

#[rstest]
#[case("https://example.com/a b")]
#[case("http:example.com")]
#[case("https:\\\\example.com\\x")]
#[case("http://example.com/<script>")]
#[tokio::test]
async fn test_non_rfc3986_uri_is_never_stored(#[future] context: Context, #[case] uri: &str) {
    let context = context.await;
    let body = json!({ "uri": uri });

    let (status, _) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &context.token,
            Some(&body),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = context.fixture.stored_task(&context.task).await.unwrap();
    assert_eq!(stored, context.task);
}

// =============================================================================
// Authorization
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_fails_without_token(#[future] context: Context) {
    let context = context.await;
    let path = format!("/tasks/{}", context.task.task_id);

    let (status, body) = context
        .fixture
        .send(json_request(Method::PATCH, &path, None, None))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unauthorized");
}

#[rstest]
#[tokio::test]
async fn test_fails_with_unknown_token(#[future] context: Context) {
    let context = context.await;
    let calls_before = context.fixture.repository.calls();

    let (status, _) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &AccessToken::generate(),
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(context.fixture.repository.calls(), calls_before);
}

#[rstest]
#[tokio::test]
async fn test_other_users_task_is_not_found(#[future] context: Context) {
    let context = context.await;
    let intruder = context.fixture.create_user();
    let intruder_token = context.fixture.login(&intruder).await;
    let body = json!({ "title": "hijacked" });

    let (status, response) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &intruder_token,
            Some(&body),
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["message"], "Task not found");
    let stored = context.fixture.stored_task(&context.task).await.unwrap();
    assert_eq!(stored.title, "original title");
}

// =============================================================================
// Successful Updates
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_updates_the_task(#[future] context: Context) {
    let context = context.await;
    let body = json!({ "title": "new title" });

    let (status, response) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &context.token,
            Some(&body),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
    assert_eq!(response["payload"]["title"], "new title");
    assert_eq!(response["payload"]["id"], context.task.task_id.to_string());
    assert_eq!(response["payload"]["owner"], context.user.user_id.to_string());

    let stored = context.fixture.stored_task(&context.task).await.unwrap();
    assert_eq!(stored.title, "new title");
    context.fixture.teardown().await;
}

#[rstest]
#[tokio::test]
async fn test_partial_update_keeps_other_fields(#[future] context: Context) {
    let context = context.await;
    let id = context.task.task_id.to_string();

    context
        .fixture
        .send(patch_task(
            &id,
            &context.token,
            Some(&json!({ "uri": "https://example.com/hook" })),
        ))
        .await;
    let (status, response) = context
        .fixture
        .send(patch_task(&id, &context.token, Some(&json!({ "method": "post" }))))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["payload"]["title"], "original title");
    assert_eq!(response["payload"]["uri"], "https://example.com/hook");
    assert_eq!(response["payload"]["method"], "post");
}

#[rstest]
#[tokio::test]
async fn test_simple_form_id_addresses_the_same_task(#[future] context: Context) {
    let context = context.await;
    let id = context.task.task_id.as_uuid().simple().to_string();

    let (status, response) = context
        .fixture
        .send(patch_task(&id, &context.token, Some(&json!({ "title": "t" }))))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["payload"]["id"], context.task.task_id.to_string());
}

#[rstest]
#[case(None)]
#[case(Some(json!({})))]
#[tokio::test]
async fn test_empty_update_returns_task_unchanged(
    #[future] context: Context,
    #[case] body: Option<Value>,
) {
    let context = context.await;

    let (status, response) = context
        .fixture
        .send(patch_task(
            &context.task.task_id.to_string(),
            &context.token,
            body.as_ref(),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["payload"]["title"], "original title");
    assert_eq!(
        response["payload"]["updated_at"],
        context.task.updated_at.to_rfc3339()
    );
}

#[rstest]
#[tokio::test]
async fn test_repeated_update_is_idempotent(#[future] context: Context) {
    let context = context.await;
    let id = context.task.task_id.to_string();
    let body = json!({ "title": "new title", "uri": "https://example.com", "method": "delete" });

    let (first_status, first) = context
        .fixture
        .send(patch_task(&id, &context.token, Some(&body)))
        .await;
    let (second_status, second) = context
        .fixture
        .send(patch_task(&id, &context.token, Some(&body)))
        .await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test]
async fn test_update_of_deleted_task_is_not_found(#[future] context: Context) {
    let context = context.await;
    let id = context.task.task_id.to_string();
    context
        .fixture
        .send(json_request(
            Method::DELETE,
            &format!("/tasks/{id}"),
            Some(&context.token),
            None,
        ))
        .await;

    let (status, response) = context
        .fixture
        .send(patch_task(&id, &context.token, Some(&json!({ "title": "x" }))))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["message"], "Task not found");
}

#[rstest]
#[tokio::test]
async fn test_random_id_is_not_found() {
    let fixture = TestFixture::setup();
    let user = fixture.create_user();
    let token = fixture.login(&user).await;

    let (status, _) = fixture
        .send(patch_task(&TaskId::generate().to_string(), &token, None))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
