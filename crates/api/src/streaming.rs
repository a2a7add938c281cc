//! WebSocket streaming API.
//!
//! Clients open one persistent connection, authenticate at the upgrade, and
//! subscribe to conversation channels. Every subscription is re-validated by
//! the access gate before any event flows.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use courier_common::{AppError, AppResult};
use courier_core::services::Identity;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    pub token: Option<String>,
}

/// An event addressed to one subscription channel.
#[derive(Debug, Clone)]
pub struct ChannelEnvelope {
    /// Channel name in its wire form.
    pub channel: String,
    /// The envelope payload.
    pub payload: Value,
}

/// Client-to-server message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to a channel.
    Subscribe { channel: String },
    /// Unsubscribe from a channel.
    Unsubscribe { channel: String },
}

/// Server-to-client message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Subscription accepted.
    Subscribed { channel: String },
    /// Request rejected.
    Error { code: String, message: String },
    /// Channel event.
    Event { channel: String, body: Value },
}

/// Shared state for streaming.
#[derive(Clone)]
pub struct StreamingState {
    /// Broadcast sender feeding every connected socket.
    tx: Arc<broadcast::Sender<ChannelEnvelope>>,
}

impl StreamingState {
    /// Create a new streaming state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx: Arc::new(tx) }
    }

    /// Publish an envelope to all connected sockets; each socket filters by
    /// its own subscriptions.
    pub fn publish(&self, channel: &str, payload: Value) {
        let _ = self.tx.send(ChannelEnvelope {
            channel: channel.to_string(),
            payload,
        });
    }

    /// Get a receiver for channel envelopes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEnvelope> {
        self.tx.subscribe()
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket handler for streaming.
///
/// The bearer credential is exchanged before the upgrade; a rejected
/// credential closes the connection immediately with no partial state.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let token = query.token.ok_or(AppError::Unauthenticated)?;
    let identity = state.identity_provider.authenticate(&token).await?;

    info!(user_id = identity.id, "Streaming connection established");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, identity, state)))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, identity: Identity, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let mut events_rx = state.streaming.subscribe();
    let mut subscriptions: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            // Handle incoming messages from the client
            Some(msg) = receiver.next() => {
                match msg {
                    Ok(Message::Text(text)) => {
                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(
                                    client_msg,
                                    &identity,
                                    &state,
                                    &mut subscriptions,
                                )
                                .await
                            }
                            Err(e) => {
                                warn!(error = %e, "Failed to parse client message");
                                Some(ServerMessage::Error {
                                    code: "VALIDATION_ERROR".to_string(),
                                    message: "Malformed message".to_string(),
                                })
                            }
                        };

                        if let Some(response) = response {
                            let json = serde_json::to_string(&response).unwrap_or_default();
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!(user_id = identity.id, "Client closed connection");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            // Forward events for subscribed channels
            Ok(envelope) = events_rx.recv() => {
                if subscriptions.contains(&envelope.channel) {
                    let msg = ServerMessage::Event {
                        channel: envelope.channel,
                        body: envelope.payload,
                    };
                    let json = serde_json::to_string(&msg).unwrap_or_default();
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // A dropped connection only deregisters its subscriptions; in-flight
    // writes it initiated still complete and still fan out.
    info!(user_id = identity.id, "Streaming connection closed");
}

/// Handle a client message.
async fn handle_client_message(
    msg: ClientMessage,
    identity: &Identity,
    state: &AppState,
    subscriptions: &mut HashSet<String>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Subscribe { channel } => {
            match state.gate.authorize_raw(identity, &channel).await {
                Ok(_) => {
                    info!(user_id = identity.id, channel = %channel, "Channel subscribed");
                    subscriptions.insert(channel.clone());
                    Some(ServerMessage::Subscribed { channel })
                }
                Err(e) => Some(ServerMessage::Error {
                    code: e.error_code().to_string(),
                    message: e.to_string(),
                }),
            }
        }
        ClientMessage::Unsubscribe { channel } => {
            subscriptions.remove(&channel);
            info!(user_id = identity.id, channel = %channel, "Channel unsubscribed");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","channel":"chat.7"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { channel } if channel == "chat.7"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"unsubscribe","channel":"user.2.main"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unsubscribe { .. }));
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Event {
            channel: "chat.7".to_string(),
            body: serde_json::json!({ "deleted_chat": 7 }),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "event",
                "channel": "chat.7",
                "body": { "deleted_chat": 7 }
            })
        );
    }

    #[test]
    fn test_streaming_state_fan_out() {
        let state = StreamingState::new();
        let mut rx = state.subscribe();

        state.publish("chat.7", serde_json::json!({ "deleted_message": 5 }));

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.channel, "chat.7");
        assert_eq!(
            envelope.payload,
            serde_json::json!({ "deleted_message": 5 })
        );
    }
}
