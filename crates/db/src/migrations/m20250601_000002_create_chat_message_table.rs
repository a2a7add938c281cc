//! Create `chat_message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key to chat: message rows outlive the parent row until
        // the asynchronous attachment cleanup task removes them.
        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessage::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMessage::ChatId).big_integer().not_null())
                    .col(
                        ColumnDef::new(ChatMessage::SenderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChatMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessage::ContentType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::SentAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: chat_id for history and cleanup walks
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_chat_id")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::ChatId)
                    .to_owned(),
            )
            .await?;

        // Composite index for the non-text cleanup walk
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_chat_content_type")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::ChatId)
                    .col(ChatMessage::ContentType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChatMessage {
    Table,
    Id,
    ChatId,
    SenderId,
    Text,
    ContentType,
    SentAt,
}
