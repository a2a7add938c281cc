//! Access control gate for real-time subscriptions.
//!
//! Every subscription request is re-validated against the target aggregate.
//! Unknown channel shapes and missing targets fail exactly like a
//! non-participant, so existence of a conversation is never leaked.

use courier_common::{AppError, AppResult};
use courier_db::repositories::{ChatRepository, TicketRepository};

use crate::services::events::ChannelName;
use crate::services::identity::Identity;

/// Uniform rejection for every unauthorized subscription.
const REJECTION: &str = "Subscription rejected";

/// Validates that a connection identity may subscribe to a channel.
#[derive(Clone)]
pub struct AccessGate {
    chat_repo: ChatRepository,
    ticket_repo: TicketRepository,
}

impl AccessGate {
    /// Create a new access gate.
    #[must_use]
    pub const fn new(chat_repo: ChatRepository, ticket_repo: TicketRepository) -> Self {
        Self {
            chat_repo,
            ticket_repo,
        }
    }

    /// Authorize a subscription to a raw channel name.
    pub async fn authorize_raw(&self, identity: &Identity, raw_channel: &str) -> AppResult<ChannelName> {
        let channel = ChannelName::parse(raw_channel)
            .ok_or_else(|| AppError::Forbidden(REJECTION.to_string()))?;
        self.authorize(identity, &channel).await?;
        Ok(channel)
    }

    /// Authorize a subscription to a parsed channel name.
    pub async fn authorize(&self, identity: &Identity, channel: &ChannelName) -> AppResult<()> {
        match channel {
            ChannelName::Chat(chat_id) => {
                let chat = self
                    .chat_repo
                    .find_by_id(*chat_id)
                    .await?
                    .ok_or_else(|| AppError::Forbidden(REJECTION.to_string()))?;
                if !chat.is_participant(identity.id) {
                    return Err(AppError::Forbidden(REJECTION.to_string()));
                }
            }
            ChannelName::Ticket(ticket_id) => {
                let ticket = self
                    .ticket_repo
                    .find_by_id(*ticket_id)
                    .await?
                    .ok_or_else(|| AppError::Forbidden(REJECTION.to_string()))?;
                if !ticket.is_participant(identity.id) {
                    return Err(AppError::Forbidden(REJECTION.to_string()));
                }
            }
            ChannelName::UserMain(user_id) => {
                if *user_id != identity.id {
                    return Err(AppError::Forbidden(REJECTION.to_string()));
                }
            }
        }

        Ok(())
    }
}
