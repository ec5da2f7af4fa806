//! In-memory poll store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ballot_common::{AppError, AppResult, IdGenerator};
use chrono::Utc;
use tokio::sync::RwLock;

use super::{PollStore, ProfileStore, VoteGuard};
use crate::model::{Poll, PollDraft, PollOption, Profile, ProfileUpdate, VoteSubmission};

/// Poll state plus who voted for what.
#[derive(Debug)]
struct Record {
    poll: Poll,
    /// Voter ID -> option IDs chosen, in order.
    voters: HashMap<String, Vec<String>>,
    /// Set under the record lock when the poll is removed, so writers still
    /// holding the record see the deletion.
    deleted: bool,
}

/// Process-local [`PollStore`].
///
/// Each poll sits behind its own lock: writers to one poll are serialized,
/// writers to different polls run in parallel, and readers always see a
/// whole submission or none of it.
#[derive(Clone, Default)]
pub struct MemoryPollStore {
    polls: Arc<RwLock<HashMap<String, Arc<RwLock<Record>>>>>,
    id_gen: IdGenerator,
}

impl MemoryPollStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, poll_id: &str) -> AppResult<Arc<RwLock<Record>>> {
        self.polls
            .read()
            .await
            .get(poll_id)
            .cloned()
            .ok_or_else(|| not_found(poll_id))
    }

    async fn collect<F>(&self, keep: F) -> Vec<Poll>
    where
        F: Fn(&Poll) -> bool + Send,
    {
        let records: Vec<_> = self.polls.read().await.values().cloned().collect();

        let mut polls = Vec::with_capacity(records.len());
        for record in records {
            let record = record.read().await;
            if !record.deleted && keep(&record.poll) {
                polls.push(record.poll.clone());
            }
        }

        polls.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        polls
    }

    async fn modify<F>(&self, poll_id: &str, change: F) -> AppResult<Poll>
    where
        F: FnOnce(&mut Poll) + Send,
    {
        let record = self.record(poll_id).await?;
        let mut record = record.write().await;
        if record.deleted {
            return Err(not_found(poll_id));
        }

        change(&mut record.poll);
        record.poll.updated_at = Some(Utc::now());
        Ok(record.poll.clone())
    }
}

fn not_found(poll_id: &str) -> AppError {
    AppError::NotFound(format!("Poll not found: {poll_id}"))
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn get(&self, poll_id: &str) -> AppResult<Poll> {
        let record = self.record(poll_id).await?;
        let record = record.read().await;
        if record.deleted {
            return Err(not_found(poll_id));
        }
        Ok(record.poll.clone())
    }

    async fn list(&self) -> AppResult<Vec<Poll>> {
        Ok(self.collect(|_| true).await)
    }

    async fn list_by_creator(&self, created_by: &str) -> AppResult<Vec<Poll>> {
        Ok(self.collect(|p| p.is_owned_by(created_by)).await)
    }

    async fn create(&self, created_by: &str, draft: PollDraft) -> AppResult<Poll> {
        let poll = Poll {
            id: self.id_gen.generate(),
            title: draft.title,
            description: draft.description,
            created_at: Utc::now(),
            updated_at: None,
            is_active: true,
            allow_multiple_votes: draft.allow_multiple_votes,
            created_by: created_by.to_string(),
            options: draft
                .options
                .into_iter()
                .map(|text| PollOption {
                    id: self.id_gen.generate(),
                    text,
                    votes: 0,
                })
                .collect(),
            total_votes: 0,
        };

        let record = Record {
            poll: poll.clone(),
            voters: HashMap::new(),
            deleted: false,
        };
        self.polls
            .write()
            .await
            .insert(poll.id.clone(), Arc::new(RwLock::new(record)));

        Ok(poll)
    }

    async fn apply_votes(
        &self,
        poll_id: &str,
        submission: &VoteSubmission,
        guard: &VoteGuard<'_>,
    ) -> AppResult<Poll> {
        let record = self.record(poll_id).await?;
        let mut record = record.write().await;
        if record.deleted {
            return Err(not_found(poll_id));
        }

        let voter = submission.voter_id.as_deref();
        {
            let prior = voter
                .and_then(|v| record.voters.get(v))
                .map_or(&[][..], Vec::as_slice);
            guard(&record.poll, prior)?;
        }

        // Resolve every id before touching a counter
        let indices = submission
            .option_ids
            .iter()
            .map(|id| {
                record
                    .poll
                    .options
                    .iter()
                    .position(|o| &o.id == id)
                    .ok_or_else(|| AppError::InvalidSubmission(format!("Unknown option: {id}")))
            })
            .collect::<AppResult<Vec<_>>>()?;

        for index in indices {
            record.poll.options[index].votes += 1;
        }
        record.poll.total_votes += submission.option_ids.len() as u64;

        if let Some(voter) = voter {
            let chosen = record.voters.entry(voter.to_string()).or_default();
            for id in &submission.option_ids {
                if !chosen.contains(id) {
                    chosen.push(id.clone());
                }
            }
        }

        Ok(record.poll.clone())
    }

    async fn set_active(&self, poll_id: &str, is_active: bool) -> AppResult<Poll> {
        self.modify(poll_id, |poll| poll.is_active = is_active).await
    }

    async fn update_details(
        &self,
        poll_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> AppResult<Poll> {
        self.modify(poll_id, |poll| {
            if let Some(title) = title {
                poll.title = title;
            }
            if let Some(description) = description {
                poll.description = description;
            }
        })
        .await
    }

    async fn get_for_voter(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<(Poll, Vec<String>)> {
        let record = self.record(poll_id).await?;
        let record = record.read().await;
        if record.deleted {
            return Err(not_found(poll_id));
        }
        let selection = record.voters.get(voter_id).cloned().unwrap_or_default();
        Ok((record.poll.clone(), selection))
    }

    async fn delete(&self, poll_id: &str) -> AppResult<()> {
        let record = self
            .polls
            .write()
            .await
            .remove(poll_id)
            .ok_or_else(|| not_found(poll_id))?;
        record.write().await.deleted = true;
        Ok(())
    }
}

/// Process-local [`ProfileStore`].
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
}

impl MemoryProfileStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &str) -> AppResult<Profile> {
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {user_id}")))
    }

    async fn save(&self, user_id: &str, update: ProfileUpdate) -> AppResult<Profile> {
        let now = Utc::now();
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile {
                id: user_id.to_string(),
                username: String::new(),
                avatar_url: None,
                created_at: now,
                updated_at: now,
            });

        profile.username = update.username;
        if update.avatar_url.is_some() {
            profile.avatar_url = update.avatar_url;
        }
        profile.updated_at = now;
        Ok(profile.clone())
    }
}
