//! Direct chat entity.
//!
//! A chat is a two-party conversation; at most one chat exists per unordered
//! pair of users.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// First participant user ID
    #[sea_orm(indexed)]
    pub user1_id: i64,

    /// Second participant user ID
    #[sea_orm(indexed)]
    pub user2_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the given user is one of the two participants.
    #[must_use]
    pub const fn is_participant(&self, user_id: i64) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other participant of the chat, given one of them.
    #[must_use]
    pub const fn peer_of(&self, user_id: i64) -> i64 {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_checks() {
        let chat = Model {
            id: 1,
            user1_id: 10,
            user2_id: 20,
        };
        assert!(chat.is_participant(10));
        assert!(chat.is_participant(20));
        assert!(!chat.is_participant(30));
        assert_eq!(chat.peer_of(10), 20);
        assert_eq!(chat.peer_of(20), 10);
    }
}
