//! Redis Pub/Sub for cross-instance event fan-out.
//!
//! Committed writes are published here and reach every server instance; each
//! instance forwards them to its own WebSocket subscribers through a local
//! broadcast channel.

use async_trait::async_trait;
use courier_common::{AppError, AppResult};
use courier_core::services::{ChannelName, EventPublisher, StreamEvent};
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// An event received from Redis, addressed to one subscription channel.
#[derive(Debug, Clone)]
pub struct PubSubMessage {
    /// Channel name in its wire form (`chat.7`, `user.2.main`, ...).
    pub channel: String,
    /// The envelope payload.
    pub payload: Value,
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    prefix: String,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<PubSubMessage>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str, prefix: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            prefix: prefix.to_string(),
            local_tx,
        })
    }

    /// Subscribe to all conversation channels and start the forwarding loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        let pattern = format!("{}:*", self.prefix);
        self.subscriber.psubscribe(pattern.as_str()).await?;

        info!(pattern = %pattern, "Subscribed to Redis Pub/Sub channels");

        let local_tx = self.local_tx.clone();
        let prefix = format!("{}:", self.prefix);
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                let channel = message.channel.to_string();
                let Some(channel) = channel.strip_prefix(&prefix) else {
                    continue;
                };

                if let Some(raw) = message.value.as_string() {
                    match serde_json::from_str::<Value>(&raw) {
                        Ok(payload) => {
                            debug!(channel = %channel, "Received Pub/Sub event");
                            let _ = local_tx.send(PubSubMessage {
                                channel: channel.to_string(),
                                payload,
                            });
                        }
                        Err(e) => {
                            warn!(channel = %channel, error = %e, "Failed to parse Pub/Sub message");
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Redis channel key for a subscription channel.
    fn redis_channel(&self, channel: &ChannelName) -> String {
        format!("{}:{channel}", self.prefix)
    }

    /// Publish a raw payload on a channel.
    pub async fn publish_raw(
        &self,
        channel: &ChannelName,
        payload: &Value,
    ) -> Result<(), RedisError> {
        let body = serde_json::to_string(payload).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self
            .publisher
            .publish(self.redis_channel(channel), body)
            .await?;
        debug!(channel = %channel, "Published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for locally forwarded events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubMessage> {
        self.local_tx.subscribe()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

/// Implementation of `EventPublisher` for `RedisPubSub`.
/// This allows core services to publish events without depending on the
/// queue crate directly.
#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish(&self, channel: &ChannelName, event: &StreamEvent) -> AppResult<()> {
        let payload = serde_json::to_value(event)
            .map_err(|e| AppError::Internal(format!("Event serialization failed: {e}")))?;

        self.publish_raw(channel, &payload)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_channel_carries_prefix() {
        let channel = ChannelName::Chat(7);
        assert_eq!(format!("courier:{channel}"), "courier:chat.7");
    }

    #[test]
    fn test_envelope_payload_round_trip() {
        let event = StreamEvent::CreatedChat { created_chat: 7 };
        let payload = serde_json::to_value(&event).unwrap();
        assert_eq!(payload, serde_json::json!({ "created_chat": 7 }));

        let parsed: StreamEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed, event);
    }
}
