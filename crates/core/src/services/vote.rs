//! Vote aggregation service.

use std::collections::HashSet;
use std::sync::Arc;

use ballot_common::{config::VotingConfig, AppError, AppResult};

use crate::model::{Poll, VoteOutcome, VoteSubmission};
use crate::store::PollStore;

/// Validates vote submissions and applies them through the poll store.
#[derive(Clone)]
pub struct VoteAggregator {
    store: Arc<dyn PollStore>,
    policy: VotingConfig,
}

impl VoteAggregator {
    /// Create a new vote aggregator.
    #[must_use]
    pub fn new(store: Arc<dyn PollStore>, policy: VotingConfig) -> Self {
        Self { store, policy }
    }

    /// Submit a vote for one or more options of a poll.
    ///
    /// Validation runs as the store's guard, so the poll state it checks is
    /// the state the increments are applied to. On error no counter changes.
    pub async fn submit_vote(
        &self,
        poll_id: &str,
        option_ids: Vec<String>,
        voter: Option<&str>,
    ) -> AppResult<VoteOutcome> {
        if voter.is_none() && !self.policy.allow_anonymous_votes {
            tracing::debug!(poll_id, "Rejected anonymous vote");
            return Err(AppError::Unauthorized);
        }

        let submission = VoteSubmission {
            option_ids,
            voter_id: voter.map(str::to_string),
        };
        let prevent_duplicates = self.policy.prevent_duplicate_votes;
        let guard = |poll: &Poll, prior: &[String]| {
            check_submission(poll, &submission.option_ids, prior, prevent_duplicates)
        };

        let result = self.store.apply_votes(poll_id, &submission, &guard).await;
        match result {
            Ok(poll) => {
                tracing::info!(
                    poll_id,
                    voter = voter.unwrap_or("anonymous"),
                    options = ?submission.option_ids,
                    total_votes = poll.total_votes,
                    "Vote accepted"
                );
                Ok(VoteOutcome::new(&poll, submission.option_ids))
            }
            Err(e) => {
                tracing::debug!(
                    poll_id,
                    voter = voter.unwrap_or("anonymous"),
                    options = ?submission.option_ids,
                    error = %e,
                    "Vote rejected"
                );
                Err(e)
            }
        }
    }
}

/// Check a submission against the current poll state.
///
/// `prior` holds the options the voter already chose on this poll; it is
/// empty for anonymous voters.
pub fn check_submission(
    poll: &Poll,
    option_ids: &[String],
    prior: &[String],
    prevent_duplicates: bool,
) -> AppResult<()> {
    if !poll.is_active {
        return Err(AppError::PollClosed(poll.id.clone()));
    }

    if option_ids.is_empty() {
        return Err(AppError::InvalidSubmission(
            "At least one option must be selected".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(option_ids.len());
    for id in option_ids {
        if !seen.insert(id.as_str()) {
            return Err(AppError::InvalidSubmission(format!(
                "Option selected more than once: {id}"
            )));
        }
        if !poll.has_option(id) {
            return Err(AppError::InvalidSubmission(format!("Unknown option: {id}")));
        }
    }

    if !poll.allow_multiple_votes && option_ids.len() != 1 {
        return Err(AppError::InvalidSubmission(
            "This poll accepts a single option".to_string(),
        ));
    }

    if prevent_duplicates {
        if !poll.allow_multiple_votes && !prior.is_empty() {
            return Err(AppError::DuplicateVote(
                "You have already voted on this poll".to_string(),
            ));
        }
        if let Some(id) = option_ids.iter().find(|id| prior.contains(id)) {
            return Err(AppError::DuplicateVote(format!(
                "You have already voted for option {id}"
            )));
        }
    }

    Ok(())
}
