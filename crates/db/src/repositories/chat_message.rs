//! Direct chat message repository.

use std::sync::Arc;

use crate::entities::{ChatMessage, ContentType, chat_message};
use chrono::Utc;
use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};

/// Repository for direct chat messages.
#[derive(Clone)]
pub struct ChatMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl ChatMessageRepository {
    /// Create a new chat message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new message.
    pub async fn create(
        &self,
        chat_id: i64,
        sender_id: i64,
        text: &str,
        content_type: ContentType,
    ) -> AppResult<chat_message::Model> {
        let model = chat_message::ActiveModel {
            chat_id: Set(chat_id),
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
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<chat_message::Model>> {
        ChatMessage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List messages of a chat in insertion order (ascending id).
    pub async fn find_by_chat(
        &self,
        chat_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<chat_message::Model>> {
        ChatMessage::find()
            .filter(chat_message::Column::ChatId.eq(chat_id))
            .order_by_asc(chat_message::Column::Id)
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One page of the chat's attachment (non-text) messages, oldest first.
    /// Used by the deferred cleanup walk.
    pub async fn find_attachments_page(
        &self,
        chat_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<chat_message::Model>> {
        ChatMessage::find()
            .filter(chat_message::Column::ChatId.eq(chat_id))
            .filter(chat_message::Column::ContentType.ne(ContentType::Text))
            .order_by_asc(chat_message::Column::Id)
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the text of a message.
    pub async fn update_text(&self, id: i64, text: &str) -> AppResult<()> {
        ChatMessage::update_many()
            .col_expr(chat_message::Column::Text, Expr::value(text))
            .filter(chat_message::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a message by ID. Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = ChatMessage::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete all messages of a chat. Returns the number of rows removed.
    pub async fn delete_by_chat(&self, chat_id: i64) -> AppResult<u64> {
        let result = ChatMessage::delete_many()
            .filter(chat_message::Column::ChatId.eq(chat_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_message(id: i64, chat_id: i64, content_type: ContentType) -> chat_message::Model {
        chat_message::Model {
            id,
            chat_id,
            sender_id: 1,
            text: "hello".to_string(),
            content_type,
            sent_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_chat_returns_insertion_order() {
        let older = test_message(1, 7, ContentType::Text);
        let newer = test_message(2, 7, ContentType::Text);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[older.clone(), newer.clone()]])
                .into_connection(),
        );

        let repo = ChatMessageRepository::new(db);
        let page = repo.find_by_chat(7, 0, 20).await.unwrap();

        // The just-sent (highest-id) message comes last within the page
        assert_eq!(page, vec![older, newer]);
    }

    #[tokio::test]
    async fn test_find_attachments_page() {
        let image = test_message(3, 7, ContentType::Image);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[image.clone()]])
                .into_connection(),
        );

        let repo = ChatMessageRepository::new(db);
        let page = repo.find_attachments_page(7, 0, 50).await.unwrap();

        assert_eq!(page, vec![image]);
    }
}
