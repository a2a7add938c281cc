//! HTTP API layer for courier.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: Chat and support ticket operations
//! - **Extractors**: Authenticated identity
//! - **Middleware**: Bearer credential exchange at the request boundary
//! - **Streaming**: WebSocket subscriptions with per-channel authorization
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use streaming::{ChannelEnvelope, StreamingState, streaming_handler};
