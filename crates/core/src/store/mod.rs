//! Poll store abstraction.
//!
//! The store is the single owner of poll state and vote counters. Services
//! receive it as `Arc<dyn PollStore>` so the backend can be swapped without
//! touching validation logic.

use async_trait::async_trait;
use ballot_common::AppResult;

use crate::model::{Poll, PollDraft, Profile, ProfileUpdate, VoteSubmission};

mod database;
mod memory;

pub use database::{DatabasePollStore, DatabaseProfileStore};
pub use memory::{MemoryPollStore, MemoryProfileStore};

/// Validation run inside the store's critical section.
///
/// Receives the poll as it is right before the vote would be applied and
/// the options the submitting voter already chose on it. An error aborts
/// [`PollStore::apply_votes`] with no counter touched.
pub type VoteGuard<'a> = dyn Fn(&Poll, &[String]) -> AppResult<()> + Send + Sync + 'a;

/// Storage for polls and their vote counters.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Get a poll by ID.
    async fn get(&self, poll_id: &str) -> AppResult<Poll>;

    /// All polls, newest first, ties broken by descending ID.
    async fn list(&self) -> AppResult<Vec<Poll>>;

    /// Polls created by `created_by`, in the same order as [`PollStore::list`].
    async fn list_by_creator(&self, created_by: &str) -> AppResult<Vec<Poll>>;

    /// Create an open poll with fresh IDs and zeroed counters.
    async fn create(&self, created_by: &str, draft: PollDraft) -> AppResult<Poll>;

    /// Run `guard`, then credit one vote to every option in `submission`.
    ///
    /// Calls for the same poll are serialized; the guard and the increments
    /// form one atomic step.
    async fn apply_votes(
        &self,
        poll_id: &str,
        submission: &VoteSubmission,
        guard: &VoteGuard<'_>,
    ) -> AppResult<Poll>;

    /// Open or close a poll.
    async fn set_active(&self, poll_id: &str, is_active: bool) -> AppResult<Poll>;

    /// Replace the title and/or description.
    async fn update_details(
        &self,
        poll_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> AppResult<Poll>;

    /// A poll together with the option IDs `voter_id` has chosen on it, in
    /// the order they were chosen.
    ///
    /// Both come from one snapshot: no vote lands between the two reads.
    async fn get_for_voter(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<(Poll, Vec<String>)>;

    /// Delete a poll together with its counters and vote records.
    async fn delete(&self, poll_id: &str) -> AppResult<()>;
}

/// Storage for user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a user's profile.
    async fn get(&self, user_id: &str) -> AppResult<Profile>;

    /// Create the profile on first save, update it afterwards.
    async fn save(&self, user_id: &str, update: ProfileUpdate) -> AppResult<Profile>;
}
