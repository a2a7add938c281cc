//! Create `chat` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chat::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chat::User1Id).big_integer().not_null())
                    .col(ColumnDef::new(Chat::User2Id).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Composite index for pair lookup (both orders are checked at create time)
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_user_pair")
                    .table(Chat::Table)
                    .col(Chat::User1Id)
                    .col(Chat::User2Id)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: user2_id for the reverse side of listing queries
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_user2_id")
                    .table(Chat::Table)
                    .col(Chat::User2Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Chat::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Chat {
    Table,
    Id,
    User1Id,
    User2Id,
}
