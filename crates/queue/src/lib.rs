//! Redis-backed messaging infrastructure for courier.
//!
//! This crate provides the two Redis integrations of the messaging core:
//!
//! - **Pub/Sub**: Real-time event broadcasting across server instances
//! - **Cleanup queue**: At-least-once delivery of attachment-key batches to
//!   the external deletion worker

pub mod cleanup;
pub mod pubsub;

pub use cleanup::{AttachmentCleanupJob, RedisCleanupQueue};
pub use pubsub::{PubSubMessage, RedisPubSub};
