//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use courier_core::services::{
    AccessGate, ChatService, IdentityProviderService, TicketService,
};

use crate::streaming::StreamingState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: ChatService,
    pub ticket_service: TicketService,
    pub gate: AccessGate,
    pub identity_provider: IdentityProviderService,
    pub streaming: StreamingState,
}

/// Authentication middleware.
///
/// Exchanges the bearer credential for an identity through the identity
/// provider and attaches it to the request. Handlers that require
/// authentication reject requests without an attached identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.identity_provider.authenticate(token).await {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Connection authentication failed");
            }
        }
    }

    next.run(req).await
}
