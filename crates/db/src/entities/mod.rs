//! Database entities.

pub mod chat;
pub mod chat_message;
pub mod content_type;
pub mod support_ticket;
pub mod ticket_message;

pub use chat::Entity as Chat;
pub use chat_message::Entity as ChatMessage;
pub use content_type::ContentType;
pub use support_ticket::{Entity as SupportTicket, TicketStatus};
pub use ticket_message::Entity as TicketMessage;

use sea_orm::entity::prelude::DateTimeWithTimeZone;

/// Shared read surface over the two concrete message entities.
///
/// The attachment coordinator and the fan-out payload builder only need these
/// fields and operate identically on direct-chat and ticket messages.
pub trait MessageRecord {
    /// Message ID.
    fn id(&self) -> i64;
    /// Sender user ID.
    fn sender_id(&self) -> i64;
    /// Message text, or the attachment key for image/video messages.
    fn text(&self) -> &str;
    /// Content type of the message.
    fn content_type(&self) -> ContentType;
    /// When the message was sent.
    fn sent_at(&self) -> DateTimeWithTimeZone;
}

impl MessageRecord for chat_message::Model {
    fn id(&self) -> i64 {
        self.id
    }

    fn sender_id(&self) -> i64 {
        self.sender_id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn content_type(&self) -> ContentType {
        self.content_type
    }

    fn sent_at(&self) -> DateTimeWithTimeZone {
        self.sent_at
    }
}

impl MessageRecord for ticket_message::Model {
    fn id(&self) -> i64 {
        self.id
    }

    fn sender_id(&self) -> i64 {
        self.sender_id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn content_type(&self) -> ContentType {
        self.content_type
    }

    fn sent_at(&self) -> DateTimeWithTimeZone {
        self.sent_at
    }
}
