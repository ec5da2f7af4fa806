//! User profile service.

use std::sync::Arc;

use ballot_common::{AppError, AppResult};
use serde::Deserialize;
use validator::Validate;

use crate::model::{Profile, ProfileUpdate};
use crate::store::ProfileStore;

/// Minimum username length in characters.
const MIN_USERNAME_LENGTH: usize = 3;

/// Input for updating the caller's profile.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(required, length(min = 3, max = 64))]
    pub username: Option<String>,

    #[serde(alias = "avatar_url")]
    #[validate(url, length(max = 2048))]
    pub avatar_url: Option<String>,
}

/// Service for reading and editing user profiles.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Get a user's profile.
    pub async fn get_profile(&self, user_id: &str) -> AppResult<Profile> {
        self.store.get(user_id).await
    }

    /// Set the username and optionally the avatar of `user_id`.
    ///
    /// The profile is created on first update.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<Profile> {
        input.validate()?;

        let username = input.username.as_deref().map(str::trim).unwrap_or_default();
        if username.chars().count() < MIN_USERNAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Username must be at least {MIN_USERNAME_LENGTH} characters"
            )));
        }

        let update = ProfileUpdate {
            username: username.to_string(),
            avatar_url: input.avatar_url,
        };
        let profile = self.store.save(user_id, update).await?;

        tracing::info!(user_id, username = %profile.username, "Profile updated");
        Ok(profile)
    }
}
