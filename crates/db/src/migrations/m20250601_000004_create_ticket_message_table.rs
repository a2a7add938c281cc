//! Create `ticket_message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key to support_ticket: message rows outlive the parent
        // row until the asynchronous attachment cleanup task removes them.
        manager
            .create_table(
                Table::create()
                    .table(TicketMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TicketMessage::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TicketMessage::TicketId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketMessage::SenderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TicketMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(TicketMessage::ContentType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TicketMessage::SentAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: ticket_id for history and cleanup walks
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_message_ticket_id")
                    .table(TicketMessage::Table)
                    .col(TicketMessage::TicketId)
                    .to_owned(),
            )
            .await?;

        // Composite index for the non-text cleanup walk
        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_message_ticket_content_type")
                    .table(TicketMessage::Table)
                    .col(TicketMessage::TicketId)
                    .col(TicketMessage::ContentType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TicketMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TicketMessage {
    Table,
    Id,
    TicketId,
    SenderId,
    Text,
    ContentType,
    SentAt,
}
