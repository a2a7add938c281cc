//! Direct chat repository.

use std::sync::Arc;

use crate::entities::{Chat, chat};
use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

/// Repository for direct chat rows.
#[derive(Clone)]
pub struct ChatRepository {
    db: Arc<DatabaseConnection>,
}

impl ChatRepository {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new chat between two users.
    pub async fn create(&self, user1_id: i64, user2_id: i64) -> AppResult<chat::Model> {
        let model = chat::ActiveModel {
            user1_id: Set(user1_id),
            user2_id: Set(user2_id),
            ..Default::default()
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a chat by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<chat::Model>> {
        Chat::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the chat for an unordered pair of users, checking both orders.
    pub async fn find_by_pair(&self, user_a: i64, user_b: i64) -> AppResult<Option<chat::Model>> {
        Chat::find()
            .filter(
                sea_orm::Condition::any()
                    .add(
                        sea_orm::Condition::all()
                            .add(chat::Column::User1Id.eq(user_a))
                            .add(chat::Column::User2Id.eq(user_b)),
                    )
                    .add(
                        sea_orm::Condition::all()
                            .add(chat::Column::User1Id.eq(user_b))
                            .add(chat::Column::User2Id.eq(user_a)),
                    ),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List chats the user participates in, newest first.
    pub async fn find_for_user(
        &self,
        user_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<chat::Model>> {
        Chat::find()
            .filter(
                sea_orm::Condition::any()
                    .add(chat::Column::User1Id.eq(user_id))
                    .add(chat::Column::User2Id.eq(user_id)),
            )
            .order_by_desc(chat::Column::Id)
            .paginate(self.db.as_ref(), size)
            .fetch_page(page)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a chat row. Returns whether a row was actually removed, so two
    /// racing deletes resolve to exactly one winner.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = Chat::delete_by_id(id)
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
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_chat(id: i64, user1_id: i64, user2_id: i64) -> chat::Model {
        chat::Model {
            id,
            user1_id,
            user2_id,
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_matches_reversed_order() {
        let chat = test_chat(7, 2, 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[chat.clone()]])
                .into_connection(),
        );

        let repo = ChatRepository::new(db);
        let found = repo.find_by_pair(1, 2).await.unwrap();

        assert_eq!(found, Some(chat));
    }

    #[tokio::test]
    async fn test_delete_reports_missing_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ChatRepository::new(db);
        assert!(!repo.delete(42).await.unwrap());
    }
}
