//! Support ticket repository.

use std::sync::Arc;

use crate::entities::{ContentType, SupportTicket, TicketStatus, support_ticket, ticket_message};
use crate::repositories::SortDirection;
use chrono::Utc;
use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// Repository for support ticket rows.
#[derive(Clone)]
pub struct TicketRepository {
    db: Arc<DatabaseConnection>,
}

impl TicketRepository {
    /// Create a new ticket repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new ticket in WAIT status together with its first message,
    /// atomically.
    pub async fn create_with_message(
        &self,
        user_id: i64,
        text: &str,
    ) -> AppResult<(support_ticket::Model, ticket_message::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ticket = support_ticket::ActiveModel {
            user_id: Set(user_id),
            admin_id: Set(None),
            status: Set(TicketStatus::Wait),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let message = ticket_message::ActiveModel {
            ticket_id: Set(ticket.id),
            sender_id: Set(user_id),
            text: Set(text.to_string()),
            content_type: Set(ContentType::Text),
            sent_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((ticket, message))
    }

    /// Find a ticket by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<support_ticket::Model>> {
        SupportTicket::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the user's active (WAIT or `IN_PROCESSING`) ticket, if any.
    pub async fn find_active_by_user(
        &self,
        user_id: i64,
    ) -> AppResult<Option<support_ticket::Model>> {
        SupportTicket::find()
            .filter(support_ticket::Column::UserId.eq(user_id))
            .filter(
                support_ticket::Column::Status
                    .is_in([TicketStatus::Wait, TicketStatus::InProcessing]),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List tickets the user participates in as owner or operator, newest
    /// first.
    pub async fn find_for_user(
        &self,
        user_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<support_ticket::Model>> {
        SupportTicket::find()
            .filter(
                sea_orm::Condition::any()
                    .add(support_ticket::Column::UserId.eq(user_id))
                    .add(support_ticket::Column::AdminId.eq(user_id)),
            )
            .order_by_desc(support_ticket::Column::Id)
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List tickets with the given status, ordered by id in the requested
    /// direction. Used for the staff waiting-list.
    pub async fn find_by_status(
        &self,
        status: TicketStatus,
        page: u64,
        size: u64,
        direction: SortDirection,
    ) -> AppResult<Vec<support_ticket::Model>> {
        SupportTicket::find()
            .filter(support_ticket::Column::Status.eq(status))
            .order_by(support_ticket::Column::Id, direction.into())
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply a status/operator change prepared by the service layer.
    pub async fn update(
        &self,
        model: support_ticket::ActiveModel,
    ) -> AppResult<support_ticket::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a ticket row. Returns whether a row was actually removed.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = SupportTicket::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_ticket(id: i64, user_id: i64, status: TicketStatus) -> support_ticket::Model {
        support_ticket::Model {
            id,
            user_id,
            admin_id: None,
            status,
        }
    }

    #[tokio::test]
    async fn test_find_active_by_user() {
        let ticket = test_ticket(3, 10, TicketStatus::Wait);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[ticket.clone()]])
                .into_connection(),
        );

        let repo = TicketRepository::new(db);
        let found = repo.find_active_by_user(10).await.unwrap();

        assert_eq!(found, Some(ticket));
    }

    #[tokio::test]
    async fn test_create_with_message_is_transactional() {
        let ticket = test_ticket(3, 10, TicketStatus::Wait);
        let message = ticket_message::Model {
            id: 1,
            ticket_id: 3,
            sender_id: 10,
            text: "help".to_string(),
            content_type: ContentType::Text,
            sent_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[ticket.clone()]])
                .append_query_results([[message.clone()]])
                .into_connection(),
        );

        let repo = TicketRepository::new(db);
        let (created, first) = repo.create_with_message(10, "help").await.unwrap();

        assert_eq!(created.status, TicketStatus::Wait);
        assert_eq!(first.ticket_id, created.id);
        assert_eq!(first.content_type, ContentType::Text);
    }
}
