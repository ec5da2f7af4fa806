//! Database repositories.

pub mod poll;
pub mod profile;

pub use poll::{PollRepository, PollWithOptions};
pub use profile::ProfileRepository;
