//! Profile repository.

use std::sync::Arc;

use crate::entities::{profile, Profile};
use ballot_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::NotSet, DatabaseConnection, EntityTrait, Set,
};

/// Profile repository for database operations.
#[derive(Clone)]
pub struct ProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by user ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<profile::Model>> {
        Profile::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user's profile in one statement.
    ///
    /// A `None` avatar leaves a stored avatar in place.
    pub async fn upsert(
        &self,
        id: &str,
        username: String,
        avatar_url: Option<String>,
    ) -> AppResult<profile::Model> {
        let now = Utc::now();
        let mut update = vec![profile::Column::Username, profile::Column::UpdatedAt];
        if avatar_url.is_some() {
            update.push(profile::Column::AvatarUrl);
        }

        let model = profile::ActiveModel {
            id: Set(id.to_string()),
            username: Set(username),
            avatar_url: avatar_url.map_or(NotSet, |url| Set(Some(url))),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Profile::insert(model)
            .on_conflict(
                OnConflict::column(profile::Column::Id)
                    .update_columns(update)
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
