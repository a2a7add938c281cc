//! Deferred attachment cleanup queue.
//!
//! When a chat or ticket is deleted, batches of attachment keys are pushed
//! here for an external worker to delete from the blob store. The queue is
//! at-least-once and never read back by this service.

use apalis::prelude::*;
use async_trait::async_trait;
use courier_common::{AppError, AppResult};
use courier_core::services::CleanupQueue;
use serde::{Deserialize, Serialize};

/// Job carrying one page of attachment keys belonging to a deleted
/// conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentCleanupJob {
    /// Attachment keys to delete from the blob store.
    pub keys: Vec<String>,
}

impl AttachmentCleanupJob {
    /// Create a new cleanup job.
    #[must_use]
    pub const fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

/// Redis-backed producer for the deferred-cleanup queue.
#[derive(Clone)]
pub struct RedisCleanupQueue {
    storage: apalis_redis::RedisStorage<AttachmentCleanupJob>,
}

impl RedisCleanupQueue {
    /// Create a new cleanup queue producer.
    pub const fn new(storage: apalis_redis::RedisStorage<AttachmentCleanupJob>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl CleanupQueue for RedisCleanupQueue {
    async fn enqueue(&self, keys: Vec<String>) -> AppResult<()> {
        let count = keys.len();
        let job = AttachmentCleanupJob::new(keys);

        self.storage
            .clone()
            .push(job)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue cleanup job: {e}")))?;

        tracing::debug!(count, "Queued attachment cleanup job");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_job_serialization() {
        let job = AttachmentCleanupJob::new(vec!["a.jpg".to_string(), "b.mp4".to_string()]);

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("a.jpg"));

        let parsed: AttachmentCleanupJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.keys, job.keys);
    }
}
