//! API integration tests.
//!
//! These drive the full router over the in-memory poll store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware, Router,
};
use ballot_api::{
    middleware::{auth_middleware, AppState, USER_ID_HEADER},
    router as api_router,
};
use ballot_common::config::VotingConfig;
use ballot_core::{MemoryPollStore, MemoryProfileStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn create_test_router() -> Router {
    let state = AppState::new(
        Arc::new(MemoryPollStore::new()),
        Arc::new(MemoryProfileStore::new()),
        &VotingConfig::default(),
    );
    Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn(auth_middleware))
        .with_state(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Extractor rejections from axum come back as plain text
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create_poll(app: &Router, owner: &str, options: &[&str], multiple: bool) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/polls",
        Some(owner),
        Some(json!({
            "title": "Best editor",
            "description": "Pick one",
            "allowMultipleVotes": multiple,
            "options": options,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

fn option_id(poll: &Value, index: usize) -> String {
    poll["options"][index]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_vote_and_tally() {
    let app = create_test_router();
    let poll = create_poll(&app, "alice", &["Vim", "Emacs"], false).await;
    let poll_id = poll["id"].as_str().unwrap();
    assert_eq!(poll["isActive"], true);
    assert_eq!(poll["totalVotes"], 0);

    let vim = option_id(&poll, 0);
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/polls/{poll_id}/vote"),
        Some("bob"),
        Some(json!({ "optionIds": [vim] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalVotes"], 1);
    assert_eq!(body["data"]["acceptedOptionIds"][0], vim.as_str());

    let (status, body) = send(&app, "GET", &format!("/api/polls/{poll_id}/vote"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalVotes"], 1);
    assert_eq!(body["data"]["options"][0]["votes"], 1);
    assert_eq!(body["data"]["options"][1]["votes"], 0);
    assert_eq!(body["data"]["options"][0]["percentage"], 100.0);

    let (status, body) = send(&app, "GET", &format!("/api/polls/{poll_id}"), Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hasVoted"], true);
    assert_eq!(body["data"]["userVotes"][0], vim.as_str());

    let (_, body) = send(&app, "GET", &format!("/api/polls/{poll_id}"), None, None).await;
    assert_eq!(body["data"]["hasVoted"], false);
}

#[tokio::test]
async fn test_list_polls() {
    let app = create_test_router();
    create_poll(&app, "alice", &["a", "b"], false).await;
    create_poll(&app, "carol", &["c", "d"], true).await;

    let (status, body) = send(&app, "GET", "/api/polls", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let polls = body["data"].as_array().unwrap();
    assert_eq!(polls.len(), 2);
    assert!(polls[0].get("options").is_none());

    let (status, body) = send(&app, "GET", "/api/users/carol/polls", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_requires_identity() {
    let app = create_test_router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/polls",
        None,
        Some(json!({ "title": "Q", "options": ["a", "b"] })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_create_rejects_invalid_draft() {
    let app = create_test_router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/polls",
        Some("alice"),
        Some(json!({ "title": "Q", "options": ["only one"] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_vote_rejections() {
    let app = create_test_router();
    let poll = create_poll(&app, "alice", &["A", "B"], false).await;
    let poll_id = poll["id"].as_str().unwrap();
    let uri = format!("/api/polls/{poll_id}/vote");
    let (a, b) = (option_id(&poll, 0), option_id(&poll, 1));

    let (status, body) = send(&app, "POST", &uri, None, Some(json!({ "optionIds": [a, b] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_SUBMISSION");

    let (status, body) = send(&app, "POST", &uri, None, Some(json!({ "optionIds": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_SUBMISSION");

    let (status, _) = send(&app, "POST", &uri, Some("bob"), Some(json!({ "optionIds": [a] }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", &uri, Some("bob"), Some(json!({ "optionIds": [b] }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_VOTE");

    let (_, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(body["data"]["totalVotes"], 1);
}

#[tokio::test]
async fn test_malformed_vote_body() {
    let app = create_test_router();
    let poll = create_poll(&app, "alice", &["A", "B"], false).await;
    let poll_id = poll["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/polls/{poll_id}/vote"),
        None,
        Some(json!({ "optionIds": "A" })),
    )
    .await;

    assert!(
        status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_close_poll() {
    let app = create_test_router();
    let poll = create_poll(&app, "alice", &["A", "B"], false).await;
    let poll_id = poll["id"].as_str().unwrap();
    let uri = format!("/api/polls/{poll_id}");
    let a = option_id(&poll, 0);

    let (status, body) = send(&app, "PUT", &uri, Some("mallory"), Some(json!({ "isActive": false }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = send(&app, "PUT", &uri, Some("alice"), Some(json!({ "isActive": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);

    let (status, body) = send(
        &app,
        "POST",
        &format!("{uri}/vote"),
        Some("bob"),
        Some(json!({ "optionIds": [a] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "POLL_CLOSED");

    let (status, body) = send(&app, "PUT", &uri, Some("alice"), Some(json!({ "isActive": true }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Results stay readable after closing
    let (status, _) = send(&app, "GET", &format!("{uri}/vote"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_title() {
    let app = create_test_router();
    let poll = create_poll(&app, "alice", &["A", "B"], false).await;
    let uri = format!("/api/polls/{}", poll["id"].as_str().unwrap());

    let (status, body) = send(&app, "PUT", &uri, Some("alice"), Some(json!({ "title": "Renamed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["isActive"], true);

    let (status, _) = send(&app, "PUT", &uri, Some("alice"), Some(json!({ "title": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_poll() {
    let app = create_test_router();
    let poll = create_poll(&app, "alice", &["A", "B"], false).await;
    let uri = format!("/api/polls/{}", poll["id"].as_str().unwrap());

    let (status, _) = send(&app, "DELETE", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "DELETE", &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, "GET", &format!("{uri}/vote"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_poll_returns_404() {
    let app = create_test_router();

    let (status, body) = send(&app, "GET", "/api/polls/missing", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_blank_identity_header_is_anonymous() {
    let app = create_test_router();

    let (status, _) = send(
        &app,
        "POST",
        "/api/polls",
        Some("   "),
        Some(json!({ "title": "Q", "options": ["a", "b"] })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_longer_than_user_id_columns_is_anonymous() {
    let app = create_test_router();
    let draft = json!({ "title": "Q", "options": ["a", "b"] });

    let too_long = "u".repeat(129);
    let (status, _) = send(&app, "POST", "/api/polls", Some(&too_long), Some(draft.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let widest = "u".repeat(128);
    let (status, body) = send(&app, "POST", "/api/polls", Some(&widest), Some(draft)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["createdBy"], widest.as_str());
}

#[tokio::test]
async fn test_update_profile() {
    let app = create_test_router();

    let (status, body) = send(&app, "GET", "/api/profile", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/profile",
        Some("alice"),
        Some(json!({ "username": "alice_w", "avatar_url": "https://cdn.example.com/a.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "alice");
    assert_eq!(body["data"]["username"], "alice_w");
    assert_eq!(body["data"]["avatarUrl"], "https://cdn.example.com/a.png");
    assert!(body["data"]["updatedAt"].is_string());

    let (status, body) = send(&app, "GET", "/api/profile", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice_w");
}

#[tokio::test]
async fn test_update_profile_rejections() {
    let app = create_test_router();

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/profile",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    for invalid in [json!({ "username": "al" }), json!({ "avatarUrl": "https://x.io/a.png" })] {
        let (status, body) = send(&app, "PATCH", "/api/profile", Some("alice"), Some(invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
