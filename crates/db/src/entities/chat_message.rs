//! Message entity for direct chats.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::content_type::ContentType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning chat ID
    #[sea_orm(indexed)]
    pub chat_id: i64,

    /// Sender user ID
    pub sender_id: i64,

    /// Message text, or the attachment key for image/video messages
    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub content_type: ContentType,

    pub sent_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chat::Entity",
        from = "Column::ChatId",
        to = "super::chat::Column::Id"
    )]
    Chat,
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
