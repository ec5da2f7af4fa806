//! Poll lifecycle service.

use std::collections::HashSet;
use std::sync::Arc;

use ballot_common::{AppError, AppResult};
use serde::Deserialize;
use validator::Validate;

use crate::model::{Poll, PollChanges, PollDraft};
use crate::store::PollStore;

/// Maximum title length in characters.
const MAX_TITLE_LENGTH: usize = 200;

/// Maximum description length in characters.
const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum option text length in characters.
const MAX_OPTION_LENGTH: usize = 100;

/// Minimum number of options.
const MIN_OPTIONS: usize = 2;

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default)]
    pub allow_multiple_votes: bool,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
}

/// Service for creating and managing polls on behalf of their owners.
#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn PollStore>,
    max_options: usize,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub fn new(store: Arc<dyn PollStore>, max_options: usize) -> Self {
        Self { store, max_options }
    }

    /// Create an open poll owned by `created_by`.
    pub async fn create_poll(&self, created_by: &str, input: CreatePollInput) -> AppResult<Poll> {
        input.validate()?;

        let title = validate_title(&input.title)?;
        validate_description(&input.description)?;
        let options = self.validate_options(input.options)?;

        let draft = PollDraft {
            title,
            description: input.description,
            allow_multiple_votes: input.allow_multiple_votes,
            options,
        };
        let poll = self.store.create(created_by, draft).await?;

        tracing::info!(
            poll_id = %poll.id,
            created_by,
            options = poll.options.len(),
            "Poll created"
        );
        Ok(poll)
    }

    /// Change the title, description or open state of a poll.
    pub async fn update_poll(
        &self,
        poll_id: &str,
        actor: &str,
        changes: PollChanges,
    ) -> AppResult<Poll> {
        let mut poll = self.get_owned(poll_id, actor).await?;

        let title = changes.title.as_deref().map(validate_title).transpose()?;
        if let Some(description) = &changes.description {
            validate_description(description)?;
        }
        let close = match changes.is_active {
            Some(is_active) => needs_transition(&poll, is_active)?,
            None => false,
        };

        if title.is_some() || changes.description.is_some() {
            poll = self
                .store
                .update_details(poll_id, title, changes.description)
                .await?;
            tracing::info!(poll_id, "Poll details updated");
        }
        if close {
            poll = self.close(poll_id).await?;
        }

        Ok(poll)
    }

    /// Open or close a poll.
    ///
    /// Setting the state a poll is already in is a no-op. A closed poll
    /// cannot be reopened.
    pub async fn set_active(&self, poll_id: &str, actor: &str, is_active: bool) -> AppResult<Poll> {
        let poll = self.get_owned(poll_id, actor).await?;

        if needs_transition(&poll, is_active)? {
            self.close(poll_id).await
        } else {
            Ok(poll)
        }
    }

    /// Delete a poll and all of its votes.
    pub async fn delete_poll(&self, poll_id: &str, actor: &str) -> AppResult<()> {
        self.get_owned(poll_id, actor).await?;
        self.store.delete(poll_id).await?;

        tracing::info!(poll_id, "Poll deleted");
        Ok(())
    }

    async fn get_owned(&self, poll_id: &str, actor: &str) -> AppResult<Poll> {
        let poll = self.store.get(poll_id).await?;

        if !poll.is_owned_by(actor) {
            return Err(AppError::Forbidden("Not the poll owner".to_string()));
        }

        Ok(poll)
    }

    async fn close(&self, poll_id: &str) -> AppResult<Poll> {
        let poll = self.store.set_active(poll_id, false).await?;
        tracing::info!(poll_id, "Poll closed");
        Ok(poll)
    }

    fn validate_options(&self, options: Vec<String>) -> AppResult<Vec<String>> {
        if options.len() < MIN_OPTIONS {
            return Err(AppError::Validation(format!(
                "Poll must have at least {MIN_OPTIONS} options"
            )));
        }
        if options.len() > self.max_options {
            return Err(AppError::Validation(format!(
                "Poll cannot have more than {} options",
                self.max_options
            )));
        }

        let mut seen = HashSet::with_capacity(options.len());
        options
            .into_iter()
            .map(|option| {
                let text = option.trim().to_string();
                if text.is_empty() {
                    return Err(AppError::Validation(
                        "Poll options cannot be empty".to_string(),
                    ));
                }
                if text.chars().count() > MAX_OPTION_LENGTH {
                    return Err(AppError::Validation(format!(
                        "Poll option is too long (max {MAX_OPTION_LENGTH} chars)"
                    )));
                }
                if !seen.insert(text.to_lowercase()) {
                    return Err(AppError::Validation(format!("Duplicate poll option: {text}")));
                }
                Ok(text)
            })
            .collect()
    }
}

/// Whether moving to `is_active` changes the poll. Reopening is rejected.
fn needs_transition(poll: &Poll, is_active: bool) -> AppResult<bool> {
    match (poll.is_active, is_active) {
        (false, true) => Err(AppError::Conflict(format!(
            "Poll {} is closed and cannot be reopened",
            poll.id
        ))),
        (current, requested) => Ok(current != requested),
    }
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Poll title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Poll title is too long (max {MAX_TITLE_LENGTH} chars)"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> AppResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "Poll description is too long (max {MAX_DESCRIPTION_LENGTH} chars)"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryPollStore;

    fn input(title: &str, options: &[&str]) -> CreatePollInput {
        CreatePollInput {
            title: title.to_string(),
            description: String::new(),
            allow_multiple_votes: false,
            options: options.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn service() -> PollService {
        PollService::new(Arc::new(MemoryPollStore::new()), 10)
    }

    #[tokio::test]
    async fn test_create_poll_trims_input() {
        let service = service();
        let poll = service
            .create_poll("alice", input("  Lunch?  ", &[" Pizza ", "Sushi"]))
            .await
            .unwrap();

        assert_eq!(poll.title, "Lunch?");
        assert_eq!(poll.options[0].text, "Pizza");
        assert!(poll.is_active);
        assert_eq!(poll.created_by, "alice");
        assert_eq!(poll.total_votes, 0);
    }

    #[tokio::test]
    async fn test_create_poll_rejects_bad_drafts() {
        let service = service();

        let cases = [
            input("   ", &["a", "b"]),
            input(&"x".repeat(201), &["a", "b"]),
            input("Q", &["only"]),
            input("Q", &["a", "  "]),
            input("Q", &["Same", "same"]),
            input("Q", &["a", "y".repeat(101).as_str()]),
            input("Q", &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"]),
        ];
        for case in cases {
            let result = service.create_poll("alice", case).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        let mut long_description = input("Q", &["a", "b"]);
        long_description.description = "d".repeat(2001);
        let result = service.create_poll("alice", long_description).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_max_options_is_configurable() {
        let service = PollService::new(Arc::new(MemoryPollStore::new()), 3);
        let result = service
            .create_poll("alice", input("Q", &["a", "b", "c", "d"]))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_only_owner_can_manage() {
        let service = service();
        let poll = service
            .create_poll("alice", input("Q", &["a", "b"]))
            .await
            .unwrap();

        let result = service.set_active(&poll.id, "mallory", false).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = service
            .update_poll(&poll.id, "mallory", PollChanges::default())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = service.delete_poll(&poll.id, "mallory").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_close_is_one_way() {
        let service = service();
        let poll = service
            .create_poll("alice", input("Q", &["a", "b"]))
            .await
            .unwrap();

        // Re-opening an open poll is a no-op
        let same = service.set_active(&poll.id, "alice", true).await.unwrap();
        assert!(same.is_active);

        let closed = service.set_active(&poll.id, "alice", false).await.unwrap();
        assert!(!closed.is_active);

        let again = service.set_active(&poll.id, "alice", false).await.unwrap();
        assert!(!again.is_active);

        let result = service.set_active(&poll.id, "alice", true).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_poll() {
        let service = service();
        let poll = service
            .create_poll("alice", input("Q", &["a", "b"]))
            .await
            .unwrap();

        let changes = PollChanges {
            title: Some(" New title ".to_string()),
            description: Some("More detail".to_string()),
            is_active: Some(false),
        };
        let updated = service.update_poll(&poll.id, "alice", changes).await.unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description, "More detail");
        assert!(!updated.is_active);
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.options, poll.options);
    }

    #[tokio::test]
    async fn test_rejected_update_changes_nothing() {
        let service = service();
        let poll = service
            .create_poll("alice", input("Q", &["a", "b"]))
            .await
            .unwrap();
        service.set_active(&poll.id, "alice", false).await.unwrap();

        let changes = PollChanges {
            title: Some("Renamed".to_string()),
            description: None,
            is_active: Some(true),
        };
        let result = service.update_poll(&poll.id, "alice", changes).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let current = service.store.get(&poll.id).await.unwrap();
        assert_eq!(current.title, "Q");
    }

    #[tokio::test]
    async fn test_delete_poll() {
        let service = service();
        let poll = service
            .create_poll("alice", input("Q", &["a", "b"]))
            .await
            .unwrap();

        service.delete_poll(&poll.id, "alice").await.unwrap();

        assert!(matches!(
            service.store.get(&poll.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_poll(&poll.id, "alice").await,
            Err(AppError::NotFound(_))
        ));
    }
}
