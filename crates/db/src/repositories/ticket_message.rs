//! Support ticket message repository.

use std::sync::Arc;

use crate::entities::{ContentType, TicketMessage, ticket_message};
use chrono::Utc;
use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};

/// Repository for support ticket messages.
#[derive(Clone)]
pub struct TicketMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl TicketMessageRepository {
    /// Create a new ticket message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new message.
    pub async fn create(
        &self,
        ticket_id: i64,
        sender_id: i64,
        text: &str,
        content_type: ContentType,
    ) -> AppResult<ticket_message::Model> {
        let model = ticket_message::ActiveModel {
            ticket_id: Set(ticket_id),
            sender_id: Set(sender_id),
            text: Set(text.to_string()),
            content_type: Set(content_type),
            sent_at: Set(Utc::now().into()),
            ..Default::default()
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<ticket_message::Model>> {
        TicketMessage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List messages of a ticket in insertion order (ascending id).
    pub async fn find_by_ticket(
        &self,
        ticket_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<ticket_message::Model>> {
        TicketMessage::find()
            .filter(ticket_message::Column::TicketId.eq(ticket_id))
            .order_by_asc(ticket_message::Column::Id)
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of the ticket's attachment (non-text) messages, oldest first.
    /// Used by the deferred cleanup walk.
    pub async fn find_attachments_page(
        &self,
        ticket_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<ticket_message::Model>> {
        TicketMessage::find()
            .filter(ticket_message::Column::TicketId.eq(ticket_id))
            .filter(ticket_message::Column::ContentType.ne(ContentType::Text))
            .order_by_asc(ticket_message::Column::Id)
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the text of a message.
    pub async fn update_text(&self, id: i64, text: &str) -> AppResult<()> {
        TicketMessage::update_many()
            .col_expr(ticket_message::Column::Text, Expr::value(text))
            .filter(ticket_message::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a message by ID. Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = TicketMessage::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete all messages of a ticket. Returns the number of rows removed.
    pub async fn delete_by_ticket(&self, ticket_id: i64) -> AppResult<u64> {
        let result = TicketMessage::delete_many()
            .filter(ticket_message::Column::TicketId.eq(ticket_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
