//! Direct chat endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use courier_common::{AppError, AppResult};
use courier_db::entities::{ContentType, chat, chat_message};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create chats router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chats))
        .route("/{id}", post(create_chat).delete(delete_chat))
        .route("/{id}/messages", get(list_messages))
        .route("/{id}/message", post(send_message))
        .route("/{id}/image", post(send_image))
        .route("/{id}/video", post(send_video))
        .route("/message/{id}", patch(update_message).delete(delete_message))
        .route("/message/{id}/image", get(download_image))
        .route("/message/{id}/video", get(download_video))
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
}

pub(crate) const fn default_page_size() -> u64 {
    20
}

/// Chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
}

impl From<chat::Model> for ChatResponse {
    fn from(chat: chat::Model) -> Self {
        Self {
            id: chat.id,
            user1_id: chat.user1_id,
            user2_id: chat.user2_id,
        }
    }
}

/// Message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender_id: i64,
    pub text: String,
    pub content_type: ContentType,
    pub sent_at: DateTime<Utc>,
}

impl From<chat_message::Model> for MessageResponse {
    fn from(msg: chat_message::Model) -> Self {
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

/// Message body for send and edit requests.
#[derive(Debug, Deserialize, Validate)]
pub struct MessageRequest {
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
}

/// List chats of the authenticated user.
async fn list_chats(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<ChatResponse>>> {
    let chats = state
        .chat_service
        .list_chats(identity.id, query.page, query.size)
        .await?;

    Ok(ApiResponse::ok(
        chats.into_iter().map(ChatResponse::from).collect(),
    ))
}

/// Open a chat with another user.
async fn create_chat(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<i64>,
) -> AppResult<ApiResponse<IdResponse>> {
    info!(initiator = identity.id, target = target_id, "Creating chat");

    let chat = state.chat_service.create(identity.id, target_id).await?;

    Ok(ApiResponse::ok(IdResponse { id: chat.id }))
}

/// Delete a chat.
async fn delete_chat(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    info!(user = identity.id, chat = chat_id, "Deleting chat");

    state.chat_service.delete_chat(chat_id, identity.id).await?;

    Ok(ApiResponse::ok(()))
}

/// List messages of a chat.
async fn list_messages(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let messages = state
        .chat_service
        .list_messages(chat_id, identity.id, query.page, query.size)
        .await?;

    Ok(ApiResponse::ok(
        messages.into_iter().map(MessageResponse::from).collect(),
    ))
}

/// Send a text message.
async fn send_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(req): Json<MessageRequest>,
) -> AppResult<ApiResponse<IdResponse>> {
    req.validate()?;

    let message = state
        .chat_service
        .send_message(chat_id, identity.id, &req.message)
        .await?;

    Ok(ApiResponse::ok(IdResponse { id: message.id }))
}

/// Send an image attachment.
async fn send_image(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<ApiResponse<IdResponse>> {
    let data = read_file_part(multipart).await?;
    let message = state
        .chat_service
        .send_file(chat_id, identity.id, data, ContentType::Image)
        .await?;

    Ok(ApiResponse::ok(IdResponse { id: message.id }))
}

/// Send a video attachment.
async fn send_video(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    multipart: Multipart,
) -> AppResult<ApiResponse<IdResponse>> {
    let data = read_file_part(multipart).await?;
    let message = state
        .chat_service
        .send_file(chat_id, identity.id, data, ContentType::Video)
        .await?;

    Ok(ApiResponse::ok(IdResponse { id: message.id }))
}

/// Edit a text message.
async fn update_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Json(req): Json<MessageRequest>,
) -> AppResult<ApiResponse<()>> {
    req.validate()?;

    state
        .chat_service
        .update_message(message_id, identity.id, &req.message)
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Delete a message.
async fn delete_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    info!(user = identity.id, message = message_id, "Deleting message");

    state
        .chat_service
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
        .chat_service
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
        .chat_service
        .get_file(message_id, identity.id, ContentType::Video)
        .await?;

    Ok(([(header::CONTENT_TYPE, media_type)], data).into_response())
}

/// Read the binary of the first file part of a multipart upload.
pub(crate) async fn read_file_part(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        return Ok(bytes.to_vec());
    }

    Err(AppError::Validation("Missing file part".to_string()))
}
