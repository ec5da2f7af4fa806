//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `ballot_test`)
//!   `TEST_DB_PASSWORD` (default: `ballot_test`)
//!   `TEST_DB_NAME` (default: `ballot_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use ballot_common::AppError;
use ballot_db::{
    entities::{poll, poll_option},
    repositories::{PollRepository, ProfileRepository},
    test_utils::{TestDatabase, TestDbConfig},
};
use chrono::Utc;
use sea_orm::{Database, DatabaseConnection, Set};

async fn connect(db: &TestDatabase) -> DatabaseConnection {
    Database::connect(&db.config.database_url())
        .await
        .expect("Failed to connect")
}

fn new_poll(id: &str, multiple: bool) -> (poll::ActiveModel, Vec<poll_option::ActiveModel>) {
    let poll = poll::ActiveModel {
        id: Set(id.to_string()),
        title: Set("Favourite colour".to_string()),
        description: Set(String::new()),
        created_by: Set("owner".to_string()),
        is_active: Set(true),
        allow_multiple_votes: Set(multiple),
        total_votes: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };
    let options = ["red", "green", "blue"]
        .iter()
        .enumerate()
        .map(|(i, text)| poll_option::ActiveModel {
            poll_id: Set(id.to_string()),
            id: Set(format!("{id}-{i}")),
            position: Set(i as i32),
            text: Set((*text).to_string()),
            votes: Set(0),
        })
        .collect();
    (poll, options)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_create_and_vote() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let repo = PollRepository::new(Arc::new(connect(&db).await));

    let (model, options) = new_poll("it-poll-1", true);
    let (created, created_options) = repo.create(model, options).await.unwrap();
    assert_eq!(created.total_votes, 0);
    assert_eq!(created_options.len(), 3);

    let chosen = vec!["it-poll-1-0".to_string(), "it-poll-1-2".to_string()];
    let vote_ids = vec!["v1".to_string(), "v2".to_string()];
    let (after, after_options) = repo
        .apply_votes("it-poll-1", &chosen, Some("voter"), &vote_ids, |_, _, prior| {
            assert!(prior.is_empty());
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(after.total_votes, 2);
    assert_eq!(after_options.iter().map(|o| o.votes).sum::<i64>(), 2);

    let (stored, stored_options) = repo.get_with_options("it-poll-1").await.unwrap();
    assert_eq!(stored.total_votes, 2);
    assert_eq!(stored_options[1].votes, 0);

    let (_, recorded) = repo
        .get_with_selection("it-poll-1", "voter")
        .await
        .unwrap();
    let recorded: Vec<_> = recorded.into_iter().map(|v| v.option_id).collect();
    assert_eq!(recorded.len(), 2);
    assert!(chosen.iter().all(|id| recorded.contains(id)));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_rejected_vote_leaves_counts() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let repo = PollRepository::new(Arc::new(connect(&db).await));

    let (model, options) = new_poll("it-poll-2", false);
    repo.create(model, options).await.unwrap();

    let result = repo
        .apply_votes(
            "it-poll-2",
            &["it-poll-2-0".to_string()],
            None,
            &[],
            |_, _, _| Err(AppError::PollClosed("it-poll-2".to_string())),
        )
        .await;
    assert!(matches!(result, Err(AppError::PollClosed(_))));

    let (stored, stored_options) = repo.get_with_options("it-poll-2").await.unwrap();
    assert_eq!(stored.total_votes, 0);
    assert!(stored_options.iter().all(|o| o.votes == 0));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_cascades() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let repo = PollRepository::new(Arc::new(connect(&db).await));

    let (model, options) = new_poll("it-poll-3", false);
    repo.create(model, options).await.unwrap();
    repo.delete("it-poll-3").await.unwrap();

    assert!(matches!(
        repo.get_with_options("it-poll-3").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        repo.delete("it-poll-3").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_profile_upsert() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let repo = ProfileRepository::new(Arc::new(connect(&db).await));

    let created = repo
        .upsert(
            "it-user",
            "alice".to_string(),
            Some("https://cdn.example.com/a.png".to_string()),
        )
        .await
        .unwrap();
    let renamed = repo
        .upsert("it-user", "alicia".to_string(), None)
        .await
        .unwrap();

    assert_eq!(renamed.username, "alicia");
    assert_eq!(renamed.avatar_url, created.avatar_url);
    assert_eq!(renamed.created_at, created.created_at);
    assert_eq!(repo.find_by_id("it-user").await.unwrap(), Some(renamed));
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testuser"));
    assert!(url.contains("testdb"));
}
