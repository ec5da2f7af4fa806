//! Domain model shared by the store and the services.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A poll and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    /// Opaque identity of the creator.
    pub created_by: String,
    pub options: Vec<PollOption>,
    /// Always equal to the sum of `options[*].votes`.
    pub total_votes: u64,
}

impl Poll {
    /// Look up an option by ID.
    #[must_use]
    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Whether `option_id` belongs to this poll.
    #[must_use]
    pub fn has_option(&self, option_id: &str) -> bool {
        self.option(option_id).is_some()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> PollStatus {
        if self.is_active {
            PollStatus::Open
        } else {
            PollStatus::Closed
        }
    }

    /// Whether `user_id` created this poll.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// One selectable choice within a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: u64,
}

/// Lifecycle state. Deleted polls no longer exist in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Open,
    Closed,
}

/// What the store needs to create a poll; ids and counters are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDraft {
    pub title: String,
    pub description: String,
    pub allow_multiple_votes: bool,
    /// Option texts in display order.
    pub options: Vec<String>,
}

/// Changes an owner may make after creation. Options are fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Lightweight projection for poll listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub total_votes: u64,
}

impl From<&Poll> for PollSummary {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id.clone(),
            title: poll.title.clone(),
            description: poll.description.clone(),
            created_at: poll.created_at,
            is_active: poll.is_active,
            total_votes: poll.total_votes,
        }
    }
}

/// A poll as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    #[serde(flatten)]
    pub poll: Poll,
    pub has_voted: bool,
    /// Option IDs the viewer has chosen so far.
    pub user_votes: Vec<String>,
}

/// Per-option vote count snapshot plus the poll total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub poll_id: String,
    pub options: Vec<OptionTally>,
    pub total_votes: u64,
}

impl Tally {
    /// Build a tally from the current state of a poll.
    #[must_use]
    pub fn of(poll: &Poll) -> Self {
        Self {
            poll_id: poll.id.clone(),
            options: poll
                .options
                .iter()
                .map(|o| OptionTally::new(o, poll.total_votes))
                .collect(),
            total_votes: poll.total_votes,
        }
    }

    /// Vote count for one option, if it exists.
    #[must_use]
    pub fn count(&self, option_id: &str) -> Option<u64> {
        self.options
            .iter()
            .find(|o| o.option_id == option_id)
            .map(|o| o.votes)
    }
}

/// One row of a tally.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: String,
    pub text: String,
    pub votes: u64,
    /// Share of all votes in percent, 0 when nobody has voted.
    pub percentage: f64,
}

impl OptionTally {
    fn new(option: &PollOption, total_votes: u64) -> Self {
        let percentage = if total_votes == 0 {
            0.0
        } else {
            option.votes as f64 * 100.0 / total_votes as f64
        };
        Self {
            option_id: option.id.clone(),
            text: option.text.clone(),
            votes: option.votes,
            percentage,
        }
    }
}

/// A validated request to credit one vote to each listed option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSubmission {
    pub option_ids: Vec<String>,
    /// Opaque voter identity; `None` for anonymous voters.
    pub voter_id: Option<String>,
}

/// Result of an accepted vote submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub poll_id: String,
    pub accepted_option_ids: Vec<String>,
    /// Updated tally rows for the options that received a vote.
    pub options: Vec<OptionTally>,
    pub total_votes: u64,
}

impl VoteOutcome {
    /// Build the outcome for `accepted` from the post-vote poll state.
    #[must_use]
    pub fn new(poll: &Poll, accepted: Vec<String>) -> Self {
        let options = poll
            .options
            .iter()
            .filter(|o| accepted.contains(&o.id))
            .map(|o| OptionTally::new(o, poll.total_votes))
            .collect();
        Self {
            poll_id: poll.id.clone(),
            accepted_option_ids: accepted,
            options,
            total_votes: poll.total_votes,
        }
    }
}

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// User ID forwarded by the auth gateway.
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated profile fields to store. `None` keeps the current avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: String,
    pub avatar_url: Option<String>,
}
