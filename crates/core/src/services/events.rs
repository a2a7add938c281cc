//! Real-time fan-out abstraction.
//!
//! Services publish envelopes to named channels after a write has committed.
//! The actual transport is provided by the queue crate (Redis Pub/Sub).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::AppResult;
use courier_db::entities::{ContentType, MessageRecord, TicketStatus};
use serde::{Deserialize, Serialize};

/// A named publish/subscribe destination.
///
/// The string forms `chat.<id>`, `ticket.<id>` and `user.<id>.main` are a
/// stable contract with clients; any other shape is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelName {
    /// Per-chat channel carrying message and lifecycle events.
    Chat(i64),
    /// Per-ticket channel carrying message and status events.
    Ticket(i64),
    /// A user's personal broadcast channel.
    UserMain(i64),
}

impl ChannelName {
    /// Parse a channel name from its wire form. Returns `None` for any
    /// unknown shape.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix("chat.") {
            return rest.parse().ok().map(Self::Chat);
        }
        if let Some(rest) = raw.strip_prefix("ticket.") {
            return rest.parse().ok().map(Self::Ticket);
        }
        if let Some(rest) = raw.strip_prefix("user.") {
            let user_id = rest.strip_suffix(".main")?;
            return user_id.parse().ok().map(Self::UserMain);
        }
        None
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(id) => write!(f, "chat.{id}"),
            Self::Ticket(id) => write!(f, "ticket.{id}"),
            Self::UserMain(id) => write!(f, "user.{id}.main"),
        }
    }
}

/// Serialized message record as broadcast on send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: i64,
    pub sender_id: i64,
    pub text: String,
    pub content_type: ContentType,
    pub sent_at: DateTime<Utc>,
}

impl MessagePayload {
    /// Build the broadcast payload from a persisted message row.
    pub fn from_record<M: MessageRecord>(message: &M) -> Self {
        Self {
            id: message.id(),
            sender_id: message.sender_id(),
            text: message.text().to_string(),
            content_type: message.content_type(),
            sent_at: message.sent_at().into(),
        }
    }
}

/// Broadcast envelope published on a channel.
///
/// The serialized shapes (`{"created_chat": id}`, ...) are a stable contract
/// with clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    /// A chat was created; delivered on the target user's personal channel.
    CreatedChat { created_chat: i64 },
    /// A chat or ticket was deleted.
    DeletedChat { deleted_chat: i64 },
    /// A message was deleted.
    DeletedMessage { deleted_message: i64 },
    /// A text message was edited.
    UpdatedMessage { updated_message: i64, text: String },
    /// A ticket changed status.
    UpdatedStatus {
        updated_status: TicketStatus,
        updater_id: i64,
    },
    /// A message was sent.
    Message(MessagePayload),
}

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events without directly
/// depending on the queue/pubsub implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event on a channel.
    async fn publish(&self, channel: &ChannelName, event: &StreamEvent) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when real-time
/// events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _channel: &ChannelName, _event: &StreamEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
