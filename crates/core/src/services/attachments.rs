//! Attachment coordination.
//!
//! Binary attachments live in the external blob store; message rows only
//! carry the attachment key. This module owns key generation, the
//! upload/download path and the deferred cleanup walk used when a whole
//! conversation is deleted.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use courier_common::{AppError, AppResult, BlobStoreService, IdGenerator, MediaKind};
use courier_db::entities::{ContentType, MessageRecord};

/// Trait for the deferred-cleanup queue producer.
///
/// The queue is append-only and at-least-once; batches are consumed by an
/// external worker and never read back by this service.
#[async_trait]
pub trait CleanupQueue: Send + Sync {
    /// Enqueue one batch of attachment keys for deferred deletion.
    async fn enqueue(&self, keys: Vec<String>) -> AppResult<()>;
}

/// A no-op implementation of `CleanupQueue` for testing.
#[derive(Clone, Default)]
pub struct NoOpCleanupQueue;

#[async_trait]
impl CleanupQueue for NoOpCleanupQueue {
    async fn enqueue(&self, _keys: Vec<String>) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `CleanupQueue` trait object.
pub type CleanupQueueService = Arc<dyn CleanupQueue>;

/// Map a message content type onto the blob store's media kind.
/// TEXT messages have no backing blob.
pub(crate) fn media_kind(content_type: ContentType) -> AppResult<MediaKind> {
    match content_type {
        ContentType::Image => Ok(MediaKind::Image),
        ContentType::Video => Ok(MediaKind::Video),
        ContentType::Text => Err(AppError::Unsupported(
            "Text messages have no attachment".to_string(),
        )),
    }
}

/// Coordinates attachment storage with the blob store and cleanup queue.
#[derive(Clone)]
pub struct AttachmentService {
    blob_store: BlobStoreService,
    cleanup: CleanupQueueService,
    id_gen: IdGenerator,
    page_size: u64,
}

impl AttachmentService {
    /// Create a new attachment service.
    #[must_use]
    pub const fn new(
        blob_store: BlobStoreService,
        cleanup: CleanupQueueService,
        page_size: u64,
    ) -> Self {
        Self {
            blob_store,
            cleanup,
            id_gen: IdGenerator::new(),
            page_size,
        }
    }

    /// Page size for the deferred cleanup walk.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Generate an opaque attachment key for the given content type.
    pub fn generate_key(&self, content_type: ContentType) -> AppResult<String> {
        Ok(self.id_gen.attachment_key(media_kind(content_type)?))
    }

    /// Upload a binary under the given key.
    pub async fn store(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: ContentType,
    ) -> AppResult<()> {
        self.blob_store
            .upload(key, data, media_kind(content_type)?)
            .await
    }

    /// Download the blob behind a message, validating that the message
    /// actually carries the requested kind of attachment.
    pub async fn fetch<M: MessageRecord>(
        &self,
        message: &M,
        requested: ContentType,
    ) -> AppResult<(Vec<u8>, &'static str)> {
        let kind = media_kind(requested)?;
        if message.content_type() != requested {
            return Err(match requested {
                ContentType::Image => AppError::Unsupported("Message is not an image".to_string()),
                _ => AppError::Unsupported("Message is not a video".to_string()),
            });
        }

        let data = self.blob_store.download(message.text(), kind).await?;
        Ok((data, kind.media_type()))
    }

    /// Best-effort blob deletion for a removed message. An orphan blob is
    /// preferable to an undeletable message, so failures are only logged.
    pub async fn discard(&self, key: &str, content_type: ContentType) {
        let Ok(kind) = media_kind(content_type) else {
            return;
        };

        if let Err(e) = self.blob_store.delete(key, kind).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete attachment blob");
        }
    }

    /// Walk the attachment keys of a deleted conversation page by page,
    /// enqueueing each page on the cleanup queue.
    ///
    /// `fetch_page` returns the keys of one fixed-size page; the walk stops
    /// at the first empty page.
    pub async fn purge<F, Fut>(&self, fetch_page: F) -> AppResult<()>
    where
        F: Fn(u64) -> Fut + Send,
        Fut: Future<Output = AppResult<Vec<String>>> + Send,
    {
        let mut page = 0;
        loop {
            let keys = fetch_page(page).await?;
            if keys.is_empty() {
                break;
            }

            let count = keys.len();
            self.cleanup.enqueue(keys).await?;
            tracing::debug!(page, count, "Enqueued attachment cleanup batch");
            page += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingCleanupQueue {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CleanupQueue for RecordingCleanupQueue {
        async fn enqueue(&self, keys: Vec<String>) -> AppResult<()> {
            self.batches.lock().unwrap().push(keys);
            Ok(())
        }
    }

    struct FailingBlobStore;

    #[async_trait]
    impl courier_common::BlobStore for FailingBlobStore {
        async fn upload(&self, _key: &str, _data: Vec<u8>, _kind: MediaKind) -> AppResult<()> {
            Err(AppError::AttachmentUploadFailed("boom".to_string()))
        }

        async fn download(&self, _key: &str, _kind: MediaKind) -> AppResult<Vec<u8>> {
            Err(AppError::ExternalService("down".to_string()))
        }

        async fn delete(&self, _key: &str, _kind: MediaKind) -> AppResult<()> {
            Err(AppError::ExternalService("down".to_string()))
        }
    }

    fn service_with(cleanup: Arc<dyn CleanupQueue>) -> AttachmentService {
        AttachmentService::new(Arc::new(FailingBlobStore), cleanup, 50)
    }

    #[test]
    fn test_generate_key_rejects_text() {
        let service = service_with(Arc::new(NoOpCleanupQueue));
        assert!(matches!(
            service.generate_key(ContentType::Text),
            Err(AppError::Unsupported(_))
        ));
        assert!(
            service
                .generate_key(ContentType::Image)
                .unwrap()
                .ends_with(".jpg")
        );
    }

    #[tokio::test]
    async fn test_discard_swallows_blob_failures() {
        let service = service_with(Arc::new(NoOpCleanupQueue));
        // Must not panic or error even though the blob store is down
        service.discard("key.jpg", ContentType::Image).await;
        service.discard("ignored", ContentType::Text).await;
    }

    #[tokio::test]
    async fn test_purge_enqueues_every_page_until_empty() {
        let cleanup = Arc::new(RecordingCleanupQueue {
            batches: Mutex::new(Vec::new()),
        });
        let service = service_with(cleanup.clone());

        let pages = vec![
            vec!["a.jpg".to_string(), "b.mp4".to_string()],
            vec!["c.jpg".to_string()],
        ];

        service
            .purge(|page| {
                let pages = pages.clone();
                async move { Ok(pages.get(page as usize).cloned().unwrap_or_default()) }
            })
            .await
            .unwrap();

        let batches = cleanup.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec!["a.jpg", "b.mp4"]);
        assert_eq!(batches[1], vec!["c.jpg"]);
    }
}
