//! Database-backed poll store.

use std::sync::Arc;

use async_trait::async_trait;
use ballot_common::{AppError, AppResult, IdGenerator};
use ballot_db::{
    entities::{poll, poll_option, profile},
    repositories::{PollRepository, ProfileRepository},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};

use super::{PollStore, ProfileStore, VoteGuard};
use crate::model::{Poll, PollDraft, PollOption, Profile, ProfileUpdate, VoteSubmission};

/// [`PollStore`] persisted through sea-orm.
///
/// Vote submissions lock the poll row for the duration of one transaction,
/// so several server processes can share the same database.
#[derive(Clone)]
pub struct DatabasePollStore {
    poll_repo: PollRepository,
    id_gen: IdGenerator,
}

impl DatabasePollStore {
    /// Create a new store on top of a connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            poll_repo: PollRepository::new(db),
            id_gen: IdGenerator::new(),
        }
    }
}

fn counter(value: i64) -> AppResult<u64> {
    u64::try_from(value).map_err(|_| AppError::Internal(format!("Negative vote counter: {value}")))
}

/// Build the domain poll from its rows.
///
/// The total is summed from the option rows, which are read by a single
/// statement, so it always matches the per-option counts.
fn to_poll(model: poll::Model, options: Vec<poll_option::Model>) -> AppResult<Poll> {
    let options = options
        .into_iter()
        .map(|o| {
            Ok(PollOption {
                id: o.id,
                text: o.text,
                votes: counter(o.votes)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    let total_votes = options.iter().map(|o| o.votes).sum();

    if counter(model.total_votes)? != total_votes {
        tracing::debug!(
            poll_id = %model.id,
            stored = model.total_votes,
            summed = total_votes,
            "Poll total read across a concurrent vote"
        );
    }

    Ok(Poll {
        id: model.id,
        title: model.title,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.map(|t| t.with_timezone(&Utc)),
        is_active: model.is_active,
        allow_multiple_votes: model.allow_multiple_votes,
        created_by: model.created_by,
        options,
        total_votes,
    })
}

#[async_trait]
impl PollStore for DatabasePollStore {
    async fn get(&self, poll_id: &str) -> AppResult<Poll> {
        let (model, options) = self.poll_repo.get_with_options(poll_id).await?;
        to_poll(model, options)
    }

    async fn list(&self) -> AppResult<Vec<Poll>> {
        self.poll_repo
            .list()
            .await?
            .into_iter()
            .map(|(model, options)| to_poll(model, options))
            .collect()
    }

    async fn list_by_creator(&self, created_by: &str) -> AppResult<Vec<Poll>> {
        self.poll_repo
            .list_by_creator(created_by)
            .await?
            .into_iter()
            .map(|(model, options)| to_poll(model, options))
            .collect()
    }

    async fn create(&self, created_by: &str, draft: PollDraft) -> AppResult<Poll> {
        let poll_id = self.id_gen.generate();

        let model = poll::ActiveModel {
            id: Set(poll_id.clone()),
            title: Set(draft.title),
            description: Set(draft.description),
            created_by: Set(created_by.to_string()),
            is_active: Set(true),
            allow_multiple_votes: Set(draft.allow_multiple_votes),
            total_votes: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let option_ids = self.id_gen.generate_many(draft.options.len());
        let options = draft
            .options
            .into_iter()
            .zip(option_ids)
            .enumerate()
            .map(|(position, (text, id))| {
                let position = i32::try_from(position)
                    .map_err(|_| AppError::BadRequest("Too many options".to_string()))?;
                Ok(poll_option::ActiveModel {
                    poll_id: Set(poll_id.clone()),
                    id: Set(id),
                    position: Set(position),
                    text: Set(text),
                    votes: Set(0),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let (model, options) = self.poll_repo.create(model, options).await?;
        to_poll(model, options)
    }

    async fn apply_votes(
        &self,
        poll_id: &str,
        submission: &VoteSubmission,
        guard: &VoteGuard<'_>,
    ) -> AppResult<Poll> {
        let voter = submission.voter_id.as_deref();
        let vote_ids = if voter.is_some() {
            self.id_gen.generate_many(submission.option_ids.len())
        } else {
            vec![]
        };

        let (model, options) = self
            .poll_repo
            .apply_votes(
                poll_id,
                &submission.option_ids,
                voter,
                &vote_ids,
                |model, options, prior| {
                    let current = to_poll(model.clone(), options.to_vec())?;
                    guard(&current, prior)?;
                    match submission
                        .option_ids
                        .iter()
                        .find(|id| !current.has_option(id))
                    {
                        Some(id) => Err(AppError::InvalidSubmission(format!(
                            "Unknown option: {id}"
                        ))),
                        None => Ok(()),
                    }
                },
            )
            .await?;

        to_poll(model, options)
    }

    async fn set_active(&self, poll_id: &str, is_active: bool) -> AppResult<Poll> {
        let model = self
            .poll_repo
            .find_by_id(poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?;

        let mut active: poll::ActiveModel = model.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Some(Utc::now().into()));
        self.poll_repo.update(active).await?;

        self.get(poll_id).await
    }

    async fn update_details(
        &self,
        poll_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> AppResult<Poll> {
        let model = self
            .poll_repo
            .find_by_id(poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?;

        let mut active: poll::ActiveModel = model.into();
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(description) = description {
            active.description = Set(description);
        }
        active.updated_at = Set(Some(Utc::now().into()));
        self.poll_repo.update(active).await?;

        self.get(poll_id).await
    }

    async fn get_for_voter(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<(Poll, Vec<String>)> {
        let ((model, options), votes) = self
            .poll_repo
            .get_with_selection(poll_id, voter_id)
            .await?;
        let selection = votes.into_iter().map(|v| v.option_id).collect();
        Ok((to_poll(model, options)?, selection))
    }

    async fn delete(&self, poll_id: &str) -> AppResult<()> {
        self.poll_repo.delete(poll_id).await
    }
}

/// [`ProfileStore`] persisted through sea-orm.
#[derive(Clone)]
pub struct DatabaseProfileStore {
    repo: ProfileRepository,
}

impl DatabaseProfileStore {
    /// Create a new store on top of a connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            repo: ProfileRepository::new(db),
        }
    }
}

fn to_profile(model: profile::Model) -> Profile {
    Profile {
        id: model.id,
        username: model.username,
        avatar_url: model.avatar_url,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl ProfileStore for DatabaseProfileStore {
    async fn get(&self, user_id: &str) -> AppResult<Profile> {
        self.repo
            .find_by_id(user_id)
            .await?
            .map(to_profile)
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {user_id}")))
    }

    async fn save(&self, user_id: &str, update: ProfileUpdate) -> AppResult<Profile> {
        let model = self
            .repo
            .upsert(user_id, update.username, update.avatar_url)
            .await?;
        Ok(to_profile(model))
    }
}
