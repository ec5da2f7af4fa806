//! User endpoints.

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use ballot_common::AppResult;
use ballot_core::PollSummary;

use crate::{middleware::AppState, response::ApiResponse};

/// List polls created by a user.
async fn list_user_polls(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<PollSummary>>> {
    let polls = state.query_service.list_polls_by_creator(&user_id).await?;
    Ok(ApiResponse::ok(polls))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/polls", get(list_user_polls))
}
