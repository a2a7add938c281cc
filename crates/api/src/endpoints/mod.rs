//! API endpoints.

pub mod chats;
pub mod tickets;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/chats", chats::router())
        .nest("/tickets", tickets::router())
}
