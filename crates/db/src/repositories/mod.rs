//! Database repositories.

pub mod chat;
pub mod chat_message;
pub mod support_ticket;
pub mod ticket_message;

pub use chat::ChatRepository;
pub use chat_message::ChatMessageRepository;
pub use support_ticket::TicketRepository;
pub use ticket_message::TicketMessageRepository;

use serde::Deserialize;

/// Sort direction for listings whose order is caller-chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending by id (oldest first).
    #[default]
    Asc,
    /// Descending by id (newest first).
    Desc,
}

impl From<SortDirection> for sea_orm::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}
