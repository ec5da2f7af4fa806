//! Create poll vote table migration.

use ballot_common::MAX_USER_ID_LENGTH;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollVote::PollId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PollVote::VoterId)
                            .string_len(MAX_USER_ID_LENGTH as u32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PollVote::OptionId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PollVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_vote_poll")
                            .from(PollVote::Table, PollVote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (poll_id, voter_id, option_id) - one vote per option per voter
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_vote_poll_voter_option")
                    .table(PollVote::Table)
                    .col(PollVote::PollId)
                    .col(PollVote::VoterId)
                    .col(PollVote::OptionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: voter_id (for listing a voter's history)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_vote_voter_id")
                    .table(PollVote::Table)
                    .col(PollVote::VoterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollVote {
    Table,
    Id,
    PollId,
    VoterId,
    OptionId,
    CreatedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
