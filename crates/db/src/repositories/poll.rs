//! Poll repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{poll, poll_option, poll_vote, Poll, PollOption, PollVote};
use ballot_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// A poll row together with its options in display order.
pub type PollWithOptions = (poll::Model, Vec<poll_option::Model>);

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll and its options, returning error if not found.
    pub async fn get_with_options(&self, id: &str) -> AppResult<PollWithOptions> {
        let poll = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))?;
        let options = options_of(self.db.as_ref(), id).await?;
        Ok((poll, options))
    }

    /// Get a poll, its options and one voter's selection as of the same moment.
    ///
    /// Holds a share lock on the poll row, which waits out any vote
    /// transaction in flight on it.
    pub async fn get_with_selection(
        &self,
        id: &str,
        voter_id: &str,
    ) -> AppResult<(PollWithOptions, Vec<poll_vote::Model>)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = Poll::find_by_id(id)
            .lock_shared()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))?;
        let options = options_of(&txn, id).await?;
        let votes = votes_of(&txn, id, voter_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(((poll, options), votes))
    }

    /// List all polls, newest first.
    pub async fn list(&self) -> AppResult<Vec<PollWithOptions>> {
        let polls = Poll::find()
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.attach_options(polls).await
    }

    /// List polls created by a user, newest first.
    pub async fn list_by_creator(&self, created_by: &str) -> AppResult<Vec<PollWithOptions>> {
        let polls = Poll::find()
            .filter(poll::Column::CreatedBy.eq(created_by))
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.attach_options(polls).await
    }

    /// Load options for a batch of polls with a single query.
    async fn attach_options(&self, polls: Vec<poll::Model>) -> AppResult<Vec<PollWithOptions>> {
        if polls.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();
        let options = PollOption::find()
            .filter(poll_option::Column::PollId.is_in(ids))
            .order_by_asc(poll_option::Column::PollId)
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_poll: HashMap<String, Vec<poll_option::Model>> = HashMap::new();
        for option in options {
            by_poll.entry(option.poll_id.clone()).or_default().push(option);
        }

        Ok(polls
            .into_iter()
            .map(|p| {
                let options = by_poll.remove(&p.id).unwrap_or_default();
                (p, options)
            })
            .collect())
    }

    /// Create a poll and its options in one transaction.
    pub async fn create(
        &self,
        model: poll::ActiveModel,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<PollWithOptions> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        PollOption::insert_many(options)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let options = options_of(&txn, &poll.id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((poll, options))
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model.update(self.db.as_ref()).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound("Poll not found".to_string()),
            e => AppError::Database(e.to_string()),
        })
    }

    /// Delete a poll. Options and votes are removed by cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = Poll::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Poll not found: {id}")));
        }
        Ok(())
    }

    /// Credit one vote to each of `option_ids` under a row lock on the poll.
    ///
    /// `check` sees the locked poll, its options and the voter's earlier
    /// selection; returning an error rolls the transaction back untouched.
    /// When `voter_id` is given, one `poll_vote` row per option is recorded
    /// using the matching entry of `vote_ids`.
    pub async fn apply_votes<F>(
        &self,
        poll_id: &str,
        option_ids: &[String],
        voter_id: Option<&str>,
        vote_ids: &[String],
        check: F,
    ) -> AppResult<PollWithOptions>
    where
        F: FnOnce(&poll::Model, &[poll_option::Model], &[String]) -> AppResult<()> + Send,
    {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut poll = Poll::find_by_id(poll_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?;

        let mut options = options_of(&txn, poll_id).await?;

        let prior: Vec<String> = match voter_id {
            Some(voter) => votes_of(&txn, poll_id, voter)
                .await?
                .into_iter()
                .map(|v| v.option_id)
                .collect(),
            None => vec![],
        };

        check(&poll, &options, &prior)?;

        let updated = PollOption::update_many()
            .col_expr(
                poll_option::Column::Votes,
                Expr::col(poll_option::Column::Votes).add(1),
            )
            .filter(poll_option::Column::PollId.eq(poll_id))
            .filter(poll_option::Column::Id.is_in(option_ids.to_vec()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Dropping the transaction here rolls the increments back
        if updated.rows_affected != option_ids.len() as u64 {
            return Err(AppError::Conflict(format!(
                "Poll {poll_id} options changed while voting"
            )));
        }

        let added = option_ids.len() as i64;
        Poll::update_many()
            .col_expr(
                poll::Column::TotalVotes,
                Expr::col(poll::Column::TotalVotes).add(added),
            )
            .filter(poll::Column::Id.eq(poll_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(voter) = voter_id {
            let now = Utc::now();
            let rows = option_ids
                .iter()
                .zip(vote_ids)
                .map(|(option_id, id)| poll_vote::ActiveModel {
                    id: Set(id.clone()),
                    poll_id: Set(poll_id.to_string()),
                    voter_id: Set(voter.to_string()),
                    option_id: Set(option_id.clone()),
                    created_at: Set(now.into()),
                });

            PollVote::insert_many(rows)
                .on_conflict(
                    OnConflict::columns([
                        poll_vote::Column::PollId,
                        poll_vote::Column::VoterId,
                        poll_vote::Column::OptionId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // The row lock guarantees these match what was just written
        poll.total_votes += added;
        for option in &mut options {
            if option_ids.contains(&option.id) {
                option.votes += 1;
            }
        }

        Ok((poll, options))
    }
}

/// Options of a poll in display order.
async fn options_of<C: ConnectionTrait>(
    conn: &C,
    poll_id: &str,
) -> AppResult<Vec<poll_option::Model>> {
    PollOption::find()
        .filter(poll_option::Column::PollId.eq(poll_id))
        .order_by_asc(poll_option::Column::Position)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// A voter's votes on a poll, oldest first.
async fn votes_of<C: ConnectionTrait>(
    conn: &C,
    poll_id: &str,
    voter_id: &str,
) -> AppResult<Vec<poll_vote::Model>> {
    PollVote::find()
        .filter(poll_vote::Column::PollId.eq(poll_id))
        .filter(poll_vote::Column::VoterId.eq(voter_id))
        .order_by_asc(poll_vote::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
