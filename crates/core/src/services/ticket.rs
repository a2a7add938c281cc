//! Messaging service for support tickets.
//!
//! Tickets move WAIT -> IN_PROCESSING -> CLOSED, with an owner-initiated
//! reopen back to WAIT. Messaging is only open while an operator is assigned.

use courier_common::{AppError, AppResult};
use courier_db::{
    entities::{ContentType, TicketStatus, support_ticket, ticket_message},
    repositories::{SortDirection, TicketMessageRepository, TicketRepository},
};
use sea_orm::Set;

use crate::services::attachments::AttachmentService;
use crate::services::blocks::BlockCheckerService;
use crate::services::events::{ChannelName, EventPublisherService, MessagePayload, StreamEvent};

/// Messaging service for support tickets.
#[derive(Clone)]
pub struct TicketService {
    ticket_repo: TicketRepository,
    message_repo: TicketMessageRepository,
    blocks: BlockCheckerService,
    attachments: AttachmentService,
    events: EventPublisherService,
}

impl TicketService {
    /// Create a new ticket service.
    #[must_use]
    pub const fn new(
        ticket_repo: TicketRepository,
        message_repo: TicketMessageRepository,
        blocks: BlockCheckerService,
        attachments: AttachmentService,
        events: EventPublisherService,
    ) -> Self {
        Self {
            ticket_repo,
            message_repo,
            blocks,
            attachments,
            events,
        }
    }

    /// Open a new ticket with its first message. A user may hold at most one
    /// ticket that is not yet closed.
    pub async fn create(
        &self,
        user_id: i64,
        text: &str,
    ) -> AppResult<(support_ticket::Model, ticket_message::Model)> {
        if self.ticket_repo.find_active_by_user(user_id).await?.is_some() {
            return Err(AppError::AlreadyExists(
                "You already have an active ticket".to_string(),
            ));
        }

        self.ticket_repo.create_with_message(user_id, text).await
    }

    /// List tickets the user participates in as owner or operator, newest
    /// first.
    pub async fn list_own(
        &self,
        user_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<support_ticket::Model>> {
        self.ticket_repo.find_for_user(user_id, page, size).await
    }

    /// List tickets waiting for staff pickup. Staff gating happens at the
    /// request boundary.
    pub async fn list_waiting(
        &self,
        page: u64,
        size: u64,
        direction: SortDirection,
    ) -> AppResult<Vec<support_ticket::Model>> {
        self.ticket_repo
            .find_by_status(TicketStatus::Wait, page, size, direction)
            .await
    }

    /// List messages of a ticket in insertion order. Participants only.
    pub async fn list_messages(
        &self,
        ticket_id: i64,
        requester_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<ticket_message::Model>> {
        let ticket = self.load_ticket(ticket_id).await?;
        Self::check_participant(&ticket, requester_id)?;

        self.message_repo
            .find_by_ticket(ticket_id, page, size)
            .await
    }

    /// Claim a waiting ticket as its operator.
    pub async fn take(&self, ticket_id: i64, admin_id: i64) -> AppResult<support_ticket::Model> {
        let ticket = self.load_ticket(ticket_id).await?;

        match ticket.status {
            TicketStatus::Closed => {
                return Err(AppError::InvalidState("Ticket is closed".to_string()));
            }
            TicketStatus::InProcessing => {
                return Err(AppError::InvalidState(
                    "Ticket is already in processing".to_string(),
                ));
            }
            TicketStatus::Wait => {}
        }

        let mut active: support_ticket::ActiveModel = ticket.into();
        active.admin_id = Set(Some(admin_id));
        active.status = Set(TicketStatus::InProcessing);
        let updated = self.ticket_repo.update(active).await?;

        self.publish_status(&updated, admin_id).await;

        Ok(updated)
    }

    /// Put a ticket back into the waiting queue. Only the owning user may
    /// reopen; the assigned operator is retained.
    pub async fn reopen(
        &self,
        ticket_id: i64,
        requester_id: i64,
    ) -> AppResult<support_ticket::Model> {
        let ticket = self.load_ticket(ticket_id).await?;

        if ticket.user_id != requester_id {
            return Err(AppError::Forbidden(
                "You are not owner of this ticket".to_string(),
            ));
        }

        match ticket.status {
            TicketStatus::Wait => {
                return Err(AppError::InvalidState(
                    "Ticket is already waiting".to_string(),
                ));
            }
            TicketStatus::Closed => {
                return Err(AppError::InvalidState("Ticket is closed".to_string()));
            }
            TicketStatus::InProcessing => {}
        }

        let mut active: support_ticket::ActiveModel = ticket.into();
        active.status = Set(TicketStatus::Wait);
        let updated = self.ticket_repo.update(active).await?;

        self.publish_status(&updated, requester_id).await;

        Ok(updated)
    }

    /// Close a ticket. Either participant may close.
    pub async fn close(
        &self,
        ticket_id: i64,
        requester_id: i64,
    ) -> AppResult<support_ticket::Model> {
        let ticket = self.load_ticket(ticket_id).await?;
        Self::check_participant(&ticket, requester_id)?;

        if ticket.status == TicketStatus::Closed {
            return Err(AppError::InvalidState(
                "Ticket is already closed".to_string(),
            ));
        }

        let mut active: support_ticket::ActiveModel = ticket.into();
        active.status = Set(TicketStatus::Closed);
        let updated = self.ticket_repo.update(active).await?;

        self.publish_status(&updated, requester_id).await;

        Ok(updated)
    }

    /// Send a text message on a ticket.
    pub async fn send_message(
        &self,
        ticket_id: i64,
        sender_id: i64,
        text: &str,
    ) -> AppResult<ticket_message::Model> {
        let message = self
            .save_message(ticket_id, sender_id, text, ContentType::Text)
            .await?;

        self.publish(
            ChannelName::Ticket(ticket_id),
            StreamEvent::Message(MessagePayload::from_record(&message)),
        )
        .await;

        Ok(message)
    }

    /// Send an image or video attachment on a ticket.
    ///
    /// As for chats, the message row is reserved before the upload so a
    /// failed upload compensates with a plain row delete.
    pub async fn send_file(
        &self,
        ticket_id: i64,
        sender_id: i64,
        data: Vec<u8>,
        content_type: ContentType,
    ) -> AppResult<ticket_message::Model> {
        let key = self.attachments.generate_key(content_type)?;
        let message = self
            .save_message(ticket_id, sender_id, &key, content_type)
            .await?;

        if let Err(upload_err) = self.attachments.store(&key, data, content_type).await {
            if let Err(delete_err) = self.message_repo.delete(message.id).await {
                tracing::error!(
                    message_id = message.id,
                    error = %delete_err,
                    "Failed to delete message row after upload failure"
                );
            }
            return Err(upload_err);
        }

        self.publish(
            ChannelName::Ticket(ticket_id),
            StreamEvent::Message(MessagePayload::from_record(&message)),
        )
        .await;

        Ok(message)
    }

    /// Download the attachment behind a ticket message. Participants only.
    pub async fn get_file(
        &self,
        message_id: i64,
        requester_id: i64,
        requested: ContentType,
    ) -> AppResult<(Vec<u8>, &'static str)> {
        let message = self.load_message(message_id).await?;
        let ticket = self.load_ticket(message.ticket_id).await?;
        Self::check_participant(&ticket, requester_id)?;

        self.attachments.fetch(&message, requested).await
    }

    /// Edit the text of a ticket message. Sender-only, text-only.
    pub async fn update_message(
        &self,
        message_id: i64,
        editor_id: i64,
        text: &str,
    ) -> AppResult<()> {
        let message = self.load_message(message_id).await?;
        Self::check_sender(&message, editor_id)?;

        match message.content_type {
            ContentType::Image => {
                return Err(AppError::Unsupported("Image cannot be updated".to_string()));
            }
            ContentType::Video => {
                return Err(AppError::Unsupported("Video cannot be updated".to_string()));
            }
            ContentType::Text => {}
        }

        self.message_repo.update_text(message_id, text).await?;

        self.publish(
            ChannelName::Ticket(message.ticket_id),
            StreamEvent::UpdatedMessage {
                updated_message: message_id,
                text: text.to_string(),
            },
        )
        .await;

        Ok(())
    }

    /// Delete a ticket message. Sender-only; blob removal is best-effort.
    pub async fn delete_message(&self, message_id: i64, requester_id: i64) -> AppResult<()> {
        let message = self.load_message(message_id).await?;
        Self::check_sender(&message, requester_id)?;

        if !self.message_repo.delete(message_id).await? {
            return Err(AppError::NotFound("Message not found".to_string()));
        }

        if message.content_type.is_attachment() {
            self.attachments
                .discard(&message.text, message.content_type)
                .await;
        }

        self.publish(
            ChannelName::Ticket(message.ticket_id),
            StreamEvent::DeletedMessage {
                deleted_message: message_id,
            },
        )
        .await;

        Ok(())
    }

    /// Delete a ticket. Mirrors chat deletion: the ticket row goes
    /// synchronously, the attachment cleanup walk runs on a background task.
    pub async fn delete_ticket(&self, ticket_id: i64, requester_id: i64) -> AppResult<()> {
        let ticket = self.load_ticket(ticket_id).await?;
        Self::check_participant(&ticket, requester_id)?;

        if !self.ticket_repo.delete(ticket_id).await? {
            return Err(AppError::NotFound("Ticket not found".to_string()));
        }

        self.publish(
            ChannelName::Ticket(ticket_id),
            StreamEvent::DeletedChat {
                deleted_chat: ticket_id,
            },
        )
        .await;

        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.purge_ticket_attachments(ticket_id).await {
                tracing::error!(ticket_id, error = %e, "Ticket attachment cleanup failed");
            }
        });

        Ok(())
    }

    /// Walk the deleted ticket's attachment messages page by page, enqueue
    /// their keys for deferred deletion, then remove the orphaned message
    /// rows. Runs on the background cleanup task.
    pub async fn purge_ticket_attachments(&self, ticket_id: i64) -> AppResult<()> {
        let size = self.attachments.page_size();
        let repo = self.message_repo.clone();

        self.attachments
            .purge(|page| {
                let repo = repo.clone();
                async move {
                    let messages = repo.find_attachments_page(ticket_id, page, size).await?;
                    Ok(messages.into_iter().map(|m| m.text).collect())
                }
            })
            .await?;

        let removed = self.message_repo.delete_by_ticket(ticket_id).await?;
        tracing::debug!(ticket_id, removed, "Removed messages of deleted ticket");

        Ok(())
    }

    async fn save_message(
        &self,
        ticket_id: i64,
        sender_id: i64,
        text: &str,
        content_type: ContentType,
    ) -> AppResult<ticket_message::Model> {
        let ticket = self.load_ticket(ticket_id).await?;
        Self::check_participant(&ticket, sender_id)?;

        match ticket.status {
            TicketStatus::Wait => {
                return Err(AppError::InvalidState(
                    "No operator has taken the ticket yet".to_string(),
                ));
            }
            TicketStatus::Closed => {
                return Err(AppError::InvalidState("Ticket is closed".to_string()));
            }
            TicketStatus::InProcessing => {}
        }

        if let Some(peer_id) = ticket.peer_of(sender_id)
            && self.blocks.has_blocked(peer_id, sender_id).await?
        {
            return Err(AppError::BlockedByPeer);
        }

        self.message_repo
            .create(ticket_id, sender_id, text, content_type)
            .await
    }

    async fn load_ticket(&self, ticket_id: i64) -> AppResult<support_ticket::Model> {
        self.ticket_repo
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
    }

    async fn load_message(&self, message_id: i64) -> AppResult<ticket_message::Model> {
        self.message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }

    fn check_participant(ticket: &support_ticket::Model, user_id: i64) -> AppResult<()> {
        if !ticket.is_participant(user_id) {
            return Err(AppError::Forbidden(
                "You are not in this ticket".to_string(),
            ));
        }
        Ok(())
    }

    fn check_sender(message: &ticket_message::Model, user_id: i64) -> AppResult<()> {
        if message.sender_id != user_id {
            return Err(AppError::Forbidden(
                "You are not owner of this message".to_string(),
            ));
        }
        Ok(())
    }

    async fn publish_status(&self, ticket: &support_ticket::Model, updater_id: i64) {
        self.publish(
            ChannelName::Ticket(ticket.id),
            StreamEvent::UpdatedStatus {
                updated_status: ticket.status,
                updater_id,
            },
        )
        .await;
    }

    async fn publish(&self, channel: ChannelName, event: StreamEvent) {
        if let Err(e) = self.events.publish(&channel, &event).await {
            tracing::warn!(channel = %channel, error = %e, "Failed to publish ticket event");
        }
    }
}
