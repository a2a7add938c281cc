//! Messaging service for direct chats.

use courier_common::{AppError, AppResult};
use courier_db::{
    entities::{ContentType, chat, chat_message},
    repositories::{ChatMessageRepository, ChatRepository},
};

use crate::services::attachments::AttachmentService;
use crate::services::blocks::BlockCheckerService;
use crate::services::events::{ChannelName, EventPublisherService, MessagePayload, StreamEvent};

/// Messaging service for direct two-party chats.
#[derive(Clone)]
pub struct ChatService {
    chat_repo: ChatRepository,
    message_repo: ChatMessageRepository,
    blocks: BlockCheckerService,
    attachments: AttachmentService,
    events: EventPublisherService,
}

impl ChatService {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(
        chat_repo: ChatRepository,
        message_repo: ChatMessageRepository,
        blocks: BlockCheckerService,
        attachments: AttachmentService,
        events: EventPublisherService,
    ) -> Self {
        Self {
            chat_repo,
            message_repo,
            blocks,
            attachments,
            events,
        }
    }

    /// Open a chat with another user.
    pub async fn create(&self, initiator_id: i64, target_id: i64) -> AppResult<chat::Model> {
        if initiator_id == target_id {
            return Err(AppError::Validation(
                "Cannot open a chat with yourself".to_string(),
            ));
        }

        if self.blocks.has_blocked(target_id, initiator_id).await? {
            return Err(AppError::BlockedByPeer);
        }

        if self
            .chat_repo
            .find_by_pair(initiator_id, target_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists("Chat already exists".to_string()));
        }

        let chat = self.chat_repo.create(initiator_id, target_id).await?;

        // The initiator already holds the result; only the target is notified.
        self.publish(
            ChannelName::UserMain(target_id),
            StreamEvent::CreatedChat {
                created_chat: chat.id,
            },
        )
        .await;

        Ok(chat)
    }

    /// List chats the user participates in, newest first.
    pub async fn list_chats(
        &self,
        user_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<chat::Model>> {
        self.chat_repo.find_for_user(user_id, page, size).await
    }

    /// List messages of a chat in insertion order. Participants only.
    pub async fn list_messages(
        &self,
        chat_id: i64,
        requester_id: i64,
        page: u64,
        size: u64,
    ) -> AppResult<Vec<chat_message::Model>> {
        let chat = self.load_chat(chat_id).await?;
        Self::check_participant(&chat, requester_id)?;

        self.message_repo.find_by_chat(chat_id, page, size).await
    }

    /// Send a text message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        sender_id: i64,
        text: &str,
    ) -> AppResult<chat_message::Model> {
        let message = self
            .save_message(chat_id, sender_id, text, ContentType::Text)
            .await?;

        self.publish(
            ChannelName::Chat(chat_id),
            StreamEvent::Message(MessagePayload::from_record(&message)),
        )
        .await;

        Ok(message)
    }

    /// Send an image or video attachment.
    ///
    /// The message row is reserved before the upload so a failed upload can
    /// be compensated with a plain row delete; no message row ever outlives a
    /// missing blob.
    pub async fn send_file(
        &self,
        chat_id: i64,
        sender_id: i64,
        data: Vec<u8>,
        content_type: ContentType,
    ) -> AppResult<chat_message::Model> {
        let key = self.attachments.generate_key(content_type)?;
        let message = self
            .save_message(chat_id, sender_id, &key, content_type)
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
            ChannelName::Chat(chat_id),
            StreamEvent::Message(MessagePayload::from_record(&message)),
        )
        .await;

        Ok(message)
    }

    /// Download the attachment behind a message. Participants only.
    pub async fn get_file(
        &self,
        message_id: i64,
        requester_id: i64,
        requested: ContentType,
    ) -> AppResult<(Vec<u8>, &'static str)> {
        let message = self.load_message(message_id).await?;
        let chat = self.load_chat(message.chat_id).await?;
        Self::check_participant(&chat, requester_id)?;

        self.attachments.fetch(&message, requested).await
    }

    /// Edit the text of a message. Only the sender may edit, and only text
    /// messages are editable.
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
            ChannelName::Chat(message.chat_id),
            StreamEvent::UpdatedMessage {
                updated_message: message_id,
                text: text.to_string(),
            },
        )
        .await;

        Ok(())
    }

    /// Delete a message. Only the sender may delete. The backing blob of an
    /// attachment message is removed best-effort after the row is gone.
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
            ChannelName::Chat(message.chat_id),
            StreamEvent::DeletedMessage {
                deleted_message: message_id,
            },
        )
        .await;

        Ok(())
    }

    /// Delete a chat. The chat row is removed synchronously so racing sends
    /// fail with `NotFound`; the attachment cleanup walk runs on a background
    /// task that the caller does not await.
    pub async fn delete_chat(&self, chat_id: i64, requester_id: i64) -> AppResult<()> {
        let chat = self.load_chat(chat_id).await?;
        Self::check_participant(&chat, requester_id)?;

        if !self.chat_repo.delete(chat_id).await? {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }

        let event = StreamEvent::DeletedChat {
            deleted_chat: chat_id,
        };
        self.publish(ChannelName::Chat(chat_id), event.clone()).await;
        self.publish(
            ChannelName::UserMain(chat.peer_of(requester_id)),
            event,
        )
        .await;

        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.purge_chat_attachments(chat_id).await {
                tracing::error!(chat_id, error = %e, "Chat attachment cleanup failed");
            }
        });

        Ok(())
    }

    /// Walk the deleted chat's attachment messages page by page, enqueue
    /// their keys for deferred deletion, then remove the orphaned message
    /// rows. Runs on the background cleanup task.
    pub async fn purge_chat_attachments(&self, chat_id: i64) -> AppResult<()> {
        let size = self.attachments.page_size();
        let repo = self.message_repo.clone();

        self.attachments
            .purge(|page| {
                let repo = repo.clone();
                async move {
                    let messages = repo.find_attachments_page(chat_id, page, size).await?;
                    Ok(messages.into_iter().map(|m| m.text).collect())
                }
            })
            .await?;

        let removed = self.message_repo.delete_by_chat(chat_id).await?;
        tracing::debug!(chat_id, removed, "Removed messages of deleted chat");

        Ok(())
    }

    async fn save_message(
        &self,
        chat_id: i64,
        sender_id: i64,
        text: &str,
        content_type: ContentType,
    ) -> AppResult<chat_message::Model> {
        let chat = self.load_chat(chat_id).await?;
        Self::check_participant(&chat, sender_id)?;

        let peer_id = chat.peer_of(sender_id);
        if self.blocks.has_blocked(peer_id, sender_id).await? {
            return Err(AppError::BlockedByPeer);
        }

        self.message_repo
            .create(chat_id, sender_id, text, content_type)
            .await
    }

    async fn load_chat(&self, chat_id: i64) -> AppResult<chat::Model> {
        self.chat_repo
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))
    }

    async fn load_message(&self, message_id: i64) -> AppResult<chat_message::Model> {
        self.message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }

    fn check_participant(chat: &chat::Model, user_id: i64) -> AppResult<()> {
        if !chat.is_participant(user_id) {
            return Err(AppError::Forbidden("You are not in this chat".to_string()));
        }
        Ok(())
    }

    fn check_sender(message: &chat_message::Model, user_id: i64) -> AppResult<()> {
        if message.sender_id != user_id {
            return Err(AppError::Forbidden(
                "You are not owner of this message".to_string(),
            ));
        }
        Ok(())
    }

    async fn publish(&self, channel: ChannelName, event: StreamEvent) {
        if let Err(e) = self.events.publish(&channel, &event).await {
            tracing::warn!(channel = %channel, error = %e, "Failed to publish chat event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::attachments::{CleanupQueue, NoOpCleanupQueue};
    use crate::services::blocks::BlockChecker;
    use crate::services::events::EventPublisher;
    use async_trait::async_trait;
    use chrono::Utc;
    use courier_common::{BlobStore, MediaKind};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::{Arc, Mutex};

    struct StaticBlocks(bool);

    #[async_trait]
    impl BlockChecker for StaticBlocks {
        async fn has_blocked(&self, _blocker_id: i64, _target_id: i64) -> AppResult<bool> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<(ChannelName, StreamEvent)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, channel: &ChannelName, event: &StreamEvent) -> AppResult<()> {
            self.events.lock().unwrap().push((*channel, event.clone()));
            Ok(())
        }
    }

    struct OkBlobStore;

    #[async_trait]
    impl BlobStore for OkBlobStore {
        async fn upload(&self, _key: &str, _data: Vec<u8>, _kind: MediaKind) -> AppResult<()> {
            Ok(())
        }

        async fn download(&self, _key: &str, _kind: MediaKind) -> AppResult<Vec<u8>> {
            Ok(vec![1, 2, 3])
        }

        async fn delete(&self, _key: &str, _kind: MediaKind) -> AppResult<()> {
            Ok(())
        }
    }

    struct FailingBlobStore;

    #[async_trait]
    impl BlobStore for FailingBlobStore {
        async fn upload(&self, _key: &str, _data: Vec<u8>, _kind: MediaKind) -> AppResult<()> {
            Err(AppError::AttachmentUploadFailed("store down".to_string()))
        }

        async fn download(&self, _key: &str, _kind: MediaKind) -> AppResult<Vec<u8>> {
            Err(AppError::ExternalService("store down".to_string()))
        }

        async fn delete(&self, _key: &str, _kind: MediaKind) -> AppResult<()> {
            Err(AppError::ExternalService("store down".to_string()))
        }
    }

    struct Fixture {
        service: ChatService,
        publisher: Arc<RecordingPublisher>,
    }

    fn fixture(
        db: DatabaseConnection,
        blocked: bool,
        blob_store: Arc<dyn BlobStore>,
    ) -> Fixture {
        let db = Arc::new(db);
        let publisher = Arc::new(RecordingPublisher::default());
        let attachments =
            AttachmentService::new(blob_store, Arc::new(NoOpCleanupQueue), 50);
        let service = ChatService::new(
            ChatRepository::new(db.clone()),
            ChatMessageRepository::new(db),
            Arc::new(StaticBlocks(blocked)),
            attachments,
            publisher.clone(),
        );
        Fixture { service, publisher }
    }

    fn test_chat(id: i64, user1_id: i64, user2_id: i64) -> chat::Model {
        chat::Model {
            id,
            user1_id,
            user2_id,
        }
    }

    fn test_message(id: i64, chat_id: i64, sender_id: i64, content_type: ContentType) -> chat_message::Model {
        chat_message::Model {
            id,
            chat_id,
            sender_id,
            text: match content_type {
                ContentType::Text => "hello".to_string(),
                _ => "abc123.jpg".to_string(),
            },
            content_type,
            sent_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create_rejected_when_target_blocked_initiator() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let f = fixture(db, true, Arc::new(OkBlobStore));

        let result = f.service.create(1, 2).await;
        assert!(matches!(result, Err(AppError::BlockedByPeer)));
    }

    #[tokio::test]
    async fn test_create_rejected_for_existing_pair() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 2, 1)]])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.create(1, 2).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_notifies_target_personal_channel_only() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<chat::Model>::new()])
            .append_query_results([[test_chat(7, 1, 2)]])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let chat = f.service.create(1, 2).await.unwrap();
        assert_eq!(chat.id, 7);

        let events = f.publisher.events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[(
                ChannelName::UserMain(2),
                StreamEvent::CreatedChat { created_chat: 7 }
            )]
        );
    }

    #[tokio::test]
    async fn test_create_with_self_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.create(1, 1).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_message_requires_participant() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 1, 2)]])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.send_message(7, 3, "hi").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_send_message_rejected_when_peer_blocked_sender() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 1, 2)]])
            .into_connection();
        let f = fixture(db, true, Arc::new(OkBlobStore));

        let result = f.service.send_message(7, 1, "hi").await;
        assert!(matches!(result, Err(AppError::BlockedByPeer)));
    }

    #[tokio::test]
    async fn test_send_message_publishes_on_chat_channel() {
        let message = test_message(5, 7, 1, ContentType::Text);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 1, 2)]])
            .append_query_results([[message.clone()]])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let sent = f.service.send_message(7, 1, "hello").await.unwrap();
        assert_eq!(sent.id, 5);

        let events = f.publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ChannelName::Chat(7));
        assert!(matches!(&events[0].1, StreamEvent::Message(p) if p.id == 5));
    }

    #[tokio::test]
    async fn test_send_message_on_missing_chat_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<chat::Model>::new()])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.send_message(7, 1, "hi").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_file_compensates_failed_upload() {
        let message = test_message(5, 7, 1, ContentType::Image);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 1, 2)]])
            .append_query_results([[message]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let f = fixture(db, false, Arc::new(FailingBlobStore));

        let result = f
            .service
            .send_file(7, 1, vec![0xff], ContentType::Image)
            .await;

        assert!(matches!(result, Err(AppError::AttachmentUploadFailed(_))));
        // Nothing was broadcast for the failed attempt
        assert!(f.publisher.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_file_rejects_text() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.send_file(7, 1, vec![], ContentType::Text).await;
        assert!(matches!(result, Err(AppError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_update_message_sender_only() {
        let message = test_message(5, 7, 1, ContentType::Text);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[message]])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.update_message(5, 2, "edited").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_message_rejects_attachments() {
        let message = test_message(5, 7, 1, ContentType::Image);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[message]])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.update_message(5, 1, "edited").await;
        assert!(matches!(result, Err(AppError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_update_message_publishes_new_text() {
        let message = test_message(5, 7, 1, ContentType::Text);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[message]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        f.service.update_message(5, 1, "edited").await.unwrap();

        let events = f.publisher.events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[(
                ChannelName::Chat(7),
                StreamEvent::UpdatedMessage {
                    updated_message: 5,
                    text: "edited".to_string()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_message_survives_blob_failure() {
        let message = test_message(5, 7, 1, ContentType::Video);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[message]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let f = fixture(db, false, Arc::new(FailingBlobStore));

        // Blob deletion fails but the row delete already happened
        f.service.delete_message(5, 1).await.unwrap();

        let events = f.publisher.events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[(
                ChannelName::Chat(7),
                StreamEvent::DeletedMessage { deleted_message: 5 }
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_chat_publishes_to_chat_and_peer() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 1, 2)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            // Consumed by the spawned cleanup walk, if it runs before the
            // mock connection is dropped
            .append_query_results([Vec::<chat_message::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        f.service.delete_chat(7, 1).await.unwrap();

        let events = f.publisher.events.lock().unwrap();
        let deleted = StreamEvent::DeletedChat { deleted_chat: 7 };
        assert_eq!(
            events.as_slice(),
            &[
                (ChannelName::Chat(7), deleted.clone()),
                (ChannelName::UserMain(2), deleted),
            ]
        );
    }

    #[tokio::test]
    async fn test_racing_delete_chat_loser_gets_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_chat(7, 1, 2)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let f = fixture(db, false, Arc::new(OkBlobStore));

        let result = f.service.delete_chat(7, 1).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(f.publisher.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_walks_pages_then_removes_rows() {
        let image = test_message(5, 7, 1, ContentType::Image);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![image]])
            .append_query_results([Vec::<chat_message::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let db = Arc::new(db);
        let publisher = Arc::new(RecordingPublisher::default());
        let batches: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        struct Recorder(Arc<Mutex<Vec<Vec<String>>>>);

        #[async_trait]
        impl CleanupQueue for Recorder {
            async fn enqueue(&self, keys: Vec<String>) -> AppResult<()> {
                self.0.lock().unwrap().push(keys);
                Ok(())
            }
        }

        let attachments = AttachmentService::new(
            Arc::new(OkBlobStore),
            Arc::new(Recorder(batches.clone())),
            50,
        );
        let service = ChatService::new(
            ChatRepository::new(db.clone()),
            ChatMessageRepository::new(db),
            Arc::new(StaticBlocks(false)),
            attachments,
            publisher,
        );

        service.purge_chat_attachments(7).await.unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.as_slice(), &[vec!["abc123.jpg".to_string()]]);
    }
}
