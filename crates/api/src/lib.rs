//! HTTP API layer for ballot.
//!
//! - **Endpoints**: poll listing, creation, management, voting, tallies and
//!   the caller's profile
//! - **Extractors**: caller identity forwarded by the auth gateway
//! - **Middleware**: identity header handling and shared state
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
