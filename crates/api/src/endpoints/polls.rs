//! Poll endpoints.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ballot_common::AppResult;
use ballot_core::{CreatePollInput, Poll, PollChanges, PollSummary, PollView, Tally, VoteOutcome};
use serde::Deserialize;
use validator::Validate;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{created, no_content, ApiResponse},
};

/// Update poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePollRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_ids: Vec<String>,
}

/// List all polls.
async fn list_polls(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<PollSummary>>> {
    let polls = state.query_service.list_polls().await?;
    Ok(ApiResponse::ok(polls))
}

/// Create a poll.
async fn create_poll(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePollInput>,
) -> AppResult<Response> {
    let poll = state.poll_service.create_poll(&user_id, req).await?;
    Ok(created(poll))
}

/// Get a poll with the caller's votes.
async fn get_poll(
    MaybeAuthUser(user_id): MaybeAuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<ApiResponse<PollView>> {
    let view = state
        .query_service
        .get_poll_for_viewer(&poll_id, user_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(view))
}

/// Update a poll's details or close it.
async fn update_poll(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(req): Json<UpdatePollRequest>,
) -> AppResult<ApiResponse<Poll>> {
    req.validate()?;

    let changes = PollChanges {
        title: req.title,
        description: req.description,
        is_active: req.is_active,
    };
    let poll = state
        .poll_service
        .update_poll(&poll_id, &user_id, changes)
        .await?;
    Ok(ApiResponse::ok(poll))
}

/// Delete a poll.
async fn delete_poll(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.poll_service.delete_poll(&poll_id, &user_id).await?;
    Ok(no_content())
}

/// Vote on a poll.
async fn vote(
    MaybeAuthUser(user_id): MaybeAuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .vote_aggregator
        .submit_vote(&poll_id, req.option_ids, user_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(outcome))
}

/// Get the current tally.
async fn tally(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<ApiResponse<Tally>> {
    let tally = state.query_service.get_tally(&poll_id).await?;
    Ok(ApiResponse::ok(tally))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route(
            "/{id}",
            get(get_poll).put(update_poll).delete(delete_poll),
        )
        .route("/{id}/vote", get(tally).post(vote))
}
