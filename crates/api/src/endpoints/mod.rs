//! API endpoints.

mod polls;
mod profile;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/polls", polls::router())
        .nest("/users", users::router())
        .nest("/profile", profile::router())
}
