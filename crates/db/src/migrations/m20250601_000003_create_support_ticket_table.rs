//! Create `support_ticket` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportTicket::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportTicket::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SupportTicket::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SupportTicket::AdminId).big_integer())
                    .col(
                        ColumnDef::new(SupportTicket::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index for the one-active-ticket-per-user lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_support_ticket_user_status")
                    .table(SupportTicket::Table)
                    .col(SupportTicket::UserId)
                    .col(SupportTicket::Status)
                    .to_owned(),
            )
            .await?;

        // Index: status for the staff waiting-list query
        manager
            .create_index(
                Index::create()
                    .name("idx_support_ticket_status")
                    .table(SupportTicket::Table)
                    .col(SupportTicket::Status)
                    .to_owned(),
            )
            .await?;

        // Index: admin_id for the own-ticket listing of staff
        manager
            .create_index(
                Index::create()
                    .name("idx_support_ticket_admin_id")
                    .table(SupportTicket::Table)
                    .col(SupportTicket::AdminId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupportTicket::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SupportTicket {
    Table,
    Id,
    UserId,
    AdminId,
    Status,
}
