//! Support ticket endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use courier_common::{AppError, AppResult};
use courier_db::entities::{ContentType, TicketStatus, support_ticket, ticket_message};
use courier_db::repositories::SortDirection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::chats::{MessageRequest, PageQuery, default_page_size, read_file_part};
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create tickets router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_waiting).post(create_ticket))
        .route("/user", get(list_own))
        .route("/{id}", delete(delete_ticket))
        .route("/{id}/messages", get(list_messages))
        .route("/{id}/message", post(send_message))
        .route("/{id}/image", post(send_image))
        .route("/{id}/video", post(send_video))
        .route("/{id}/close", patch(close_ticket))
        .route("/{id}/status/wait", patch(reopen_ticket))
        .route("/{id}/status/processing", patch(take_ticket))
        .route("/message/{id}", patch(update_message).delete(delete_message))
        .route("/message/{id}/image", get(download_image))
        .route("/message/{id}/video", get(download_video))
}

/// Waiting-list query parameters.
#[derive(Debug, Deserialize)]
pub struct WaitingQuery {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    #[serde(default)]
    pub sort: SortDirection,
}

/// Ticket response.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub user_id: i64,
    pub admin_id: Option<i64>,
    pub status: TicketStatus,
}

impl From<support_ticket::Model> for TicketResponse {
    fn from(ticket: support_ticket::Model) -> Self {
        Self {
            id: ticket.id,
            user_id: ticket.user_id,
            admin_id: ticket.admin_id,
            status: ticket.status,
        }
    }
}

/// Ticket message response.
#[derive(Debug, Serialize)]
pub struct TicketMessageResponse {
    pub id: i64,
    pub sender_id: i64,
    pub text: String,
    pub content_type: ContentType,
    pub sent_at: DateTime<Utc>,
}

impl From<ticket_message::Model> for TicketMessageResponse {
    fn from(msg: ticket_message::Model) -> Self {
        Self {
            id: msg.id,
            sender_id: msg.sender_id,
            text: msg.text,
            content_type: msg.content_type,
            sent_at: msg.sent_at.into(),
        }
    }
}

/// Identifier payload returned by mutations.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: i64,
}

/// List tickets waiting for pickup. Staff only.
async fn list_waiting(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<WaitingQuery>,
) -> AppResult<ApiResponse<Vec<TicketResponse>>> {
    if !identity.is_staff() {
        return Err(AppError::Forbidden("Staff only".to_string()));
    }

    let tickets = state
        .ticket_service
        .list_waiting(query.page, query.size, query.sort)
        .await?;

    Ok(ApiResponse::ok(
        tickets.into_iter().map(TicketResponse::from).collect(),
    ))
}

/// List tickets of the authenticated user (as owner or operator).
async fn list_own(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<TicketResponse>>> {
    let tickets = state
        .ticket_service
        .list_own(identity.id, query.page, query.size)
        .await?;

    Ok(ApiResponse::ok(
        tickets.into_iter().map(TicketResponse::from).collect(),
    ))
}

/// Open a ticket with its first message.
async fn create_ticket(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> AppResult<ApiResponse<IdResponse>> {
    req.validate()?;

    info!(user = identity.id, "Creating support ticket");

    let (ticket, _message) = state.ticket_service.create(identity.id, &req.message).await?;

    Ok(ApiResponse::ok(IdResponse { id: ticket.id }))
}

/// Delete a ticket.
async fn delete_ticket(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    info!(user = identity.id, ticket = ticket_id, "Deleting ticket");

    state
        .ticket_service
        .delete_ticket(ticket_id, identity.id)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// List messages of a ticket.
async fn list_messages(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<TicketMessageResponse>>> {
    let messages = state
        .ticket_service
        .list_messages(ticket_id, identity.id, query.page, query.size)
        .await?;

    Ok(ApiResponse::ok(
        messages
            .into_iter()
            .map(TicketMessageResponse::from)
            .collect(),
    ))
}

/// Send a text message on a ticket.
async fn send_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    Json(req): Json<MessageRequest>,
) -> AppResult<ApiResponse<IdResponse>> {
    req.validate()?;

    let message = state
        .ticket_service
        .send_message(ticket_id, identity.id, &req.message)
        .await?;

    Ok(ApiResponse::ok(IdResponse { id: message.id }))
}

/// Send an image attachment on a ticket.
async fn send_image(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<ApiResponse<IdResponse>> {
    let data = read_file_part(multipart).await?;
    let message = state
        .ticket_service
        .send_file(ticket_id, identity.id, data, ContentType::Image)
        .await?;

    Ok(ApiResponse::ok(IdResponse { id: message.id }))
}

/// Send a video attachment on a ticket.
async fn send_video(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<ApiResponse<IdResponse>> {
    let data = read_file_part(multipart).await?;
    let message = state
        .ticket_service
        .send_file(ticket_id, identity.id, data, ContentType::Video)
        .await?;

    Ok(ApiResponse::ok(IdResponse { id: message.id }))
}

/// Close a ticket.
async fn close_ticket(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    info!(user = identity.id, ticket = ticket_id, "Closing ticket");

    state.ticket_service.close(ticket_id, identity.id).await?;

    Ok(ApiResponse::ok(()))
}

/// Put a ticket back into the waiting queue.
async fn reopen_ticket(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    info!(user = identity.id, ticket = ticket_id, "Reopening ticket");

    state.ticket_service.reopen(ticket_id, identity.id).await?;

    Ok(ApiResponse::ok(()))
}

/// Claim a waiting ticket. Staff only.
async fn take_ticket(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    if !identity.is_staff() {
        return Err(AppError::Forbidden("Staff only".to_string()));
    }

    info!(admin = identity.id, ticket = ticket_id, "Taking ticket");

    state.ticket_service.take(ticket_id, identity.id).await?;

    Ok(ApiResponse::ok(()))
}

/// Edit a text message on a ticket.
async fn update_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Json(req): Json<MessageRequest>,
) -> AppResult<ApiResponse<()>> {
    req.validate()?;

    state
        .ticket_service
        .update_message(message_id, identity.id, &req.message)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Delete a message on a ticket.
async fn delete_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    info!(user = identity.id, message = message_id, "Deleting ticket message");

    state
        .ticket_service
        .delete_message(message_id, identity.id)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Download an image attachment.
async fn download_image(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> AppResult<Response> {
    let (data, media_type) = state
        .ticket_service
        .get_file(message_id, identity.id, ContentType::Image)
        .await?;

    Ok(([(header::CONTENT_TYPE, media_type)], data).into_response())
}

/// Download a video attachment.
async fn download_video(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> AppResult<Response> {
    let (data, media_type) = state
        .ticket_service
        .get_file(message_id, identity.id, ContentType::Video)
        .await?;

    Ok(([(header::CONTENT_TYPE, media_type)], data).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_response_serialization() {
        let response = TicketResponse {
            id: 3,
            user_id: 10,
            admin_id: None,
            status: TicketStatus::Wait,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "WAIT");
        assert_eq!(json["admin_id"], serde_json::Value::Null);
    }

    #[test]
    fn test_waiting_query_defaults() {
        let query: WaitingQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 0);
        assert_eq!(query.size, 20);
        assert_eq!(query.sort, SortDirection::Asc);
    }
}
