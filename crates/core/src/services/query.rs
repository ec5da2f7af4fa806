//! Read-only poll projections.

use std::sync::Arc;

use ballot_common::AppResult;

use crate::model::{Poll, PollSummary, PollView, Tally};
use crate::store::PollStore;

/// Query service for polls and tallies.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn PollStore>,
}

impl QueryService {
    /// Create a new query service.
    #[must_use]
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    /// Get a poll by ID.
    pub async fn get_poll(&self, poll_id: &str) -> AppResult<Poll> {
        self.store.get(poll_id).await
    }

    /// Get a poll together with what `viewer` has voted for.
    pub async fn get_poll_for_viewer(
        &self,
        poll_id: &str,
        viewer: Option<&str>,
    ) -> AppResult<PollView> {
        let (poll, user_votes) = match viewer {
            Some(viewer) => self.store.get_for_voter(poll_id, viewer).await?,
            None => (self.store.get(poll_id).await?, vec![]),
        };

        Ok(PollView {
            poll,
            has_voted: !user_votes.is_empty(),
            user_votes,
        })
    }

    /// List all polls, newest first.
    pub async fn list_polls(&self) -> AppResult<Vec<PollSummary>> {
        let polls = self.store.list().await?;
        Ok(polls.iter().map(PollSummary::from).collect())
    }

    /// List polls created by a user, newest first.
    pub async fn list_polls_by_creator(&self, created_by: &str) -> AppResult<Vec<PollSummary>> {
        let polls = self.store.list_by_creator(created_by).await?;
        Ok(polls.iter().map(PollSummary::from).collect())
    }

    /// Current vote counts of a poll.
    pub async fn get_tally(&self, poll_id: &str) -> AppResult<Tally> {
        let poll = self.store.get(poll_id).await?;
        Ok(Tally::of(&poll))
    }
}
