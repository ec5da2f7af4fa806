//! Profile endpoints.

use axum::{extract::State, routing::get, Json, Router};
use ballot_common::AppResult;
use ballot_core::{Profile, UpdateProfileInput};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Get the caller's profile.
async fn get_profile(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Profile>> {
    let profile = state.profile_service.get_profile(&user_id).await?;
    Ok(ApiResponse::ok(profile))
}

/// Update the caller's username and avatar.
async fn update_profile(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<Profile>> {
    let profile = state
        .profile_service
        .update_profile(&user_id, req)
        .await?;
    Ok(ApiResponse::ok(profile))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_profile).patch(update_profile))
}
