//! Core business logic for ballot.
//!
//! - [`model`]: polls, options, tallies, vote submissions and profiles
//! - [`store`]: the [`PollStore`] and [`ProfileStore`] abstractions with
//!   in-memory and database backends
//! - [`services`]: vote aggregation, read projections, poll lifecycle and
//!   user profiles

pub mod model;
pub mod services;
pub mod store;

pub use model::*;
pub use services::*;
pub use store::{
    DatabasePollStore, DatabaseProfileStore, MemoryPollStore, MemoryProfileStore, PollStore,
    ProfileStore, VoteGuard,
};
