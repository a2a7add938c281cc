//! Support ticket entity.
//!
//! A support ticket is a conversation between one user and an assigned staff
//! operator, with a status lifecycle of WAIT, `IN_PROCESSING` and CLOSED.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a support ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Waiting for a staff operator to claim the ticket.
    #[sea_orm(string_value = "WAIT")]
    Wait,
    /// Claimed by a staff operator; messaging is open.
    #[sea_orm(string_value = "IN_PROCESSING")]
    InProcessing,
    /// Closed; no further transitions or messages.
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_ticket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Ticket owner user ID
    #[sea_orm(indexed)]
    pub user_id: i64,

    /// Assigned staff operator, if any
    #[sea_orm(nullable, indexed)]
    pub admin_id: Option<i64>,

    pub status: TicketStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ticket_message::Entity")]
    Messages,
}

impl Related<super::ticket_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the given user may read or act on this ticket.
    #[must_use]
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.user_id == user_id || self.admin_id == Some(user_id)
    }

    /// The other participant, given one of them. `None` while no operator is
    /// assigned.
    #[must_use]
    pub fn peer_of(&self, user_id: i64) -> Option<i64> {
        if self.user_id == user_id {
            self.admin_id
        } else {
            Some(self.user_id)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialized_values() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::InProcessing).unwrap(),
            "\"IN_PROCESSING\""
        );
        assert_eq!(
            serde_json::to_string(&TicketStatus::Wait).unwrap(),
            "\"WAIT\""
        );
    }

    #[test]
    fn test_participants() {
        let ticket = Model {
            id: 1,
            user_id: 10,
            admin_id: None,
            status: TicketStatus::Wait,
        };
        assert!(ticket.is_participant(10));
        assert!(!ticket.is_participant(99));
        assert_eq!(ticket.peer_of(10), None);

        let taken = Model {
            admin_id: Some(99),
            status: TicketStatus::InProcessing,
            ..ticket
        };
        assert!(taken.is_participant(99));
        assert_eq!(taken.peer_of(10), Some(99));
        assert_eq!(taken.peer_of(99), Some(10));
    }
}
