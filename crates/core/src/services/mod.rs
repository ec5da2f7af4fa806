//! Business logic services.

#![allow(missing_docs)]

pub mod poll;
pub mod profile;
pub mod query;
pub mod vote;

pub use poll::{CreatePollInput, PollService};
pub use profile::{ProfileService, UpdateProfileInput};
pub use query::QueryService;
pub use vote::{check_submission, VoteAggregator};
