use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;
use ember_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{Message, NewMessage};
use crate::rules;
use crate::services::{conversation_service, message_service};
use crate::socket;
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

// --- Socket payloads ---

#[derive(Debug, Serialize)]
struct MessageEvent<'a> {
    conversation_id: Uuid,
    message: &'a Message,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub message: Message,
    pub emoji: String,
    pub added: bool,
}

// --- Helpers ---

/// Check the caller may post into the conversation before doing any work.
fn ensure_can_post(state: &AppState, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let mut conn = state.db.get()?;
    let (conversation, _) = conversation_service::load_for_member(&mut conn, conversation_id, user_id)?;
    conversation_service::ensure_active(&conversation)
}

async fn deliver(state: &AppState, new: NewMessage) -> AppResult<Message> {
    let kind = if new.media_url.is_some() { "media" } else { "text" };
    let sent = {
        let mut conn = state.db.get()?;
        message_service::send(&mut conn, new, Utc::now())?
    };

    metrics::counter!("messages_sent_total", "kind" => kind).increment(1);

    let message = sent.message;
    socket::push(
        &state.io,
        &sent.recipients,
        "new_message",
        &MessageEvent { conversation_id: message.conversation_id, message: &message },
    );

    tracing::info!(
        sender = %message.sender_id,
        conversation = %message.conversation_id,
        message_id = %message.id,
        recipients = sent.recipients.len(),
        "message sent"
    );

    publisher::publish_message_sent(&state.rabbitmq, &message, sent.recipients).await;

    Ok(message)
}

// --- Handlers ---

/// GET /conversations/:id/messages - newest first
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let mut conn = state.db.get()?;
    conversation_service::load_for_member(&mut conn, conversation_id, user.id)?;

    let (items, total) = message_service::list(&mut conn, conversation_id, &params)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// POST /conversations/:id/messages
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let media = rules::attachment(req.media_url, req.media_type)?;
    if let Some((url, _)) = &media {
        if !state.storage.owns_url(url) {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "attachments must be uploaded through the media endpoint",
            ));
        }
    }
    let content = rules::normalize_content(req.content.as_deref(), media.is_some())?;
    let (media_url, media_type) = media.unzip();

    ensure_can_post(&state, conversation_id, user.id)?;

    let message = deliver(
        &state,
        NewMessage {
            conversation_id,
            sender_id: user.id,
            content,
            media_url,
            media_type,
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(message)))
}

/// POST /conversations/:id/media - upload an attachment and send it
pub async fn send_media(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<Message>>> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::ValidationError, format!("multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::new(ErrorCode::ValidationError, format!("failed to read file: {e}")))?;
                file = Some((data.to_vec(), content_type));
            }
            "content" => {
                caption = Some(field.text().await.map_err(|e| {
                    AppError::new(ErrorCode::ValidationError, format!("failed to read caption: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let (data, content_type) =
        file.ok_or_else(|| AppError::new(ErrorCode::ValidationError, "no file provided"))?;

    let ext = rules::media_extension(&content_type).ok_or_else(|| {
        AppError::new(
            ErrorCode::ValidationError,
            "unsupported format, accepted: jpeg, png, webp, gif, mp4, webm",
        )
    })?;

    if data.len() > state.config.max_media_bytes {
        return Err(AppError::with_details(
            ErrorCode::PayloadTooLarge,
            "attachment is too large",
            serde_json::json!({ "max_bytes": state.config.max_media_bytes }),
        ));
    }

    let content = rules::normalize_content(caption.as_deref(), true)?;
    ensure_can_post(&state, conversation_id, user.id)?;

    let key = format!("messages/{}/{}.{}", conversation_id, Uuid::now_v7(), ext);
    let media_url = state
        .storage
        .upload(&key, data, &content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %key, "media upload failed");
            AppError::new(ErrorCode::ServiceUnavailable, "media storage unavailable")
        })?;

    let message = deliver(
        &state,
        NewMessage {
            conversation_id,
            sender_id: user.id,
            content,
            media_url: Some(media_url),
            media_type: Some(content_type),
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(message)))
}

/// PATCH /messages/:id - sender edit inside the edit window
pub async fn edit_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<Uuid>,
    Json(req): Json<EditMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let changed = {
        let mut conn = state.db.get()?;
        message_service::edit(
            &mut conn,
            message_id,
            user.id,
            req.content.as_deref(),
            Utc::now(),
            state.config.edit_window_minutes,
        )?
    };

    let message = changed.message;
    socket::push_to_others(
        &state.io,
        &changed.members,
        user.id,
        "message_updated",
        &MessageEvent { conversation_id: message.conversation_id, message: &message },
    );

    Ok(Json(ApiResponse::ok(message)))
}

/// DELETE /messages/:id - soft delete by the sender
pub async fn delete_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let deleted = {
        let mut conn = state.db.get()?;
        message_service::soft_delete(&mut conn, message_id, user.id, Utc::now())?
    };

    let changed = deleted.changed;
    let message = changed.message;
    if let Some(url) = &deleted.removed_media {
        if let Err(e) = state.storage.delete_by_url(url).await {
            tracing::warn!(error = %e, url = %url, "failed to delete message media");
        }
    }
    if deleted.deleted_now {
        socket::push_to_others(
            &state.io,
            &changed.members,
            user.id,
            "message_deleted",
            &serde_json::json!({
                "conversation_id": message.conversation_id,
                "message_id": message.id,
            }),
        );
        tracing::info!(user_id = %user.id, message_id = %message.id, "message deleted");
    }

    Ok(Json(ApiResponse::ok(message)))
}

/// POST /messages/:id/reactions - toggle the caller's reaction
pub async fn react(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<Uuid>,
    Json(req): Json<ReactionRequest>,
) -> AppResult<Json<ApiResponse<ReactionResponse>>> {
    let emoji = req.emoji.trim().to_string();
    let (changed, added) = {
        let mut conn = state.db.get()?;
        message_service::toggle_reaction(&mut conn, message_id, user.id, &emoji)?
    };

    let message = changed.message;
    socket::push_to_others(
        &state.io,
        &changed.members,
        user.id,
        "message_reaction",
        &serde_json::json!({
            "conversation_id": message.conversation_id,
            "message_id": message.id,
            "user_id": user.id,
            "emoji": emoji,
            "added": added,
            "reactions": message.reactions,
        }),
    );

    Ok(Json(ApiResponse::ok(ReactionResponse { message, emoji, added })))
}
