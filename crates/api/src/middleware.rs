//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use ballot_common::{config::VotingConfig, MAX_USER_ID_LENGTH};
use ballot_core::{
    PollService, PollStore, ProfileService, ProfileStore, QueryService, VoteAggregator,
};

use crate::extractors::Identity;

/// Header carrying the caller's user ID, set by the upstream auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub vote_aggregator: VoteAggregator,
    pub query_service: QueryService,
    pub poll_service: PollService,
    pub profile_service: ProfileService,
}

impl AppState {
    /// Build the services on top of one shared poll store and a profile store.
    #[must_use]
    pub fn new(
        store: Arc<dyn PollStore>,
        profiles: Arc<dyn ProfileStore>,
        voting: &VotingConfig,
    ) -> Self {
        Self {
            vote_aggregator: VoteAggregator::new(Arc::clone(&store), voting.clone()),
            query_service: QueryService::new(Arc::clone(&store)),
            poll_service: PollService::new(store, voting.max_options),
            profile_service: ProfileService::new(profiles),
        }
    }
}

/// Authentication middleware.
///
/// Credentials are verified upstream; this only lifts the forwarded user ID
/// into request extensions. A missing, blank or oversized header leaves the
/// request anonymous.
///
/// The header is trusted as-is, so the server must only be reachable through
/// the gateway, which strips any client-supplied value. Browsers are kept
/// from sending it cross-origin by the CORS policy, which does not list it.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    let identity = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_USER_ID_LENGTH)
        .map(|id| Identity(id.to_string()));

    if let Some(identity) = identity {
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}
