use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use ember_shared::errors::AppResult;
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;
use ember_shared::types::profile::ProfileSummary;

use crate::models::Conversation;
use crate::services::conversation_service;
use crate::socket;
use crate::AppState;

// --- Response DTOs ---

#[derive(Debug, Serialize)]
pub struct ConversationPreview {
    pub id: Uuid,
    pub match_id: Option<Uuid>,
    pub is_active: bool,
    pub partner_id: Option<Uuid>,
    pub partner: Option<ProfileSummary>,
    pub last_message: Option<String>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub unread_count: i32,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: DateTime<Utc>,
    pub profile: Option<ProfileSummary>,
}

#[derive(Debug, Serialize)]
pub struct ReadReceipt {
    pub conversation_id: Uuid,
    pub reader_id: Uuid,
    pub read_at: DateTime<Utc>,
    pub messages_read: usize,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub total_unread: i64,
}

// --- Handlers ---

/// GET /conversations - caller's conversations, most recent activity first
pub async fn list_conversations(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<ConversationPreview>>>> {
    let rows = {
        let mut conn = state.db.get()?;
        conversation_service::list_for_user(&mut conn, user.id)?
    };

    let partner_ids: Vec<Uuid> = rows.iter().filter_map(|(c, _)| c.partner_of(user.id)).collect();
    let profiles = state.users.profile_map(&partner_ids).await;

    let previews = rows
        .into_iter()
        .map(|(conv, member)| {
            let partner_id = conv.partner_of(user.id);
            ConversationPreview {
                id: conv.id,
                match_id: conv.match_id,
                is_active: conv.is_active,
                partner: partner_id.and_then(|id| profiles.get(&id).cloned()),
                partner_id,
                last_message: conv.last_message_text,
                last_message_sender_id: conv.last_message_sender_id,
                last_message_at: conv.last_message_at,
                unread_count: member.unread_count,
                created_at: conv.created_at,
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(previews)))
}

/// GET /conversations/:id
pub async fn get_conversation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ConversationDetail>>> {
    let (conversation, me, members) = {
        let mut conn = state.db.get()?;
        let (conversation, me) = conversation_service::load_for_member(&mut conn, conversation_id, user.id)?;
        let members = conversation_service::members(&mut conn, conversation_id)?;
        (conversation, me, members)
    };

    let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
    let mut profiles = state.users.profile_map(&ids).await;

    let members = members
        .into_iter()
        .map(|m| MemberView {
            user_id: m.user_id,
            joined_at: m.joined_at,
            last_read_at: m.last_read_at,
            profile: profiles.remove(&m.user_id),
        })
        .collect();

    Ok(Json(ApiResponse::ok(ConversationDetail {
        conversation,
        unread_count: me.unread_count,
        members,
    })))
}

/// POST /conversations/:id/read - read receipts for the partner's messages
pub async fn mark_as_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReadReceipt>>> {
    let now = Utc::now();
    let (messages_read, members) = {
        let mut conn = state.db.get()?;
        conversation_service::load_for_member(&mut conn, conversation_id, user.id)?;
        let read = conversation_service::mark_read(&mut conn, conversation_id, user.id, now)?;
        (read, conversation_service::member_ids(&mut conn, conversation_id)?)
    };

    let receipt = ReadReceipt {
        conversation_id,
        reader_id: user.id,
        read_at: now,
        messages_read,
    };
    socket::push_to_others(&state.io, &members, user.id, "messages_read", &receipt);

    tracing::debug!(user_id = %user.id, conversation_id = %conversation_id, messages_read, "conversation read");

    Ok(Json(ApiResponse::ok(receipt)))
}

/// GET /unread-count - sum of the caller's unread counters
pub async fn get_unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let mut conn = state.db.get()?;
    let total_unread = conversation_service::unread_total(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(UnreadCountResponse { total_unread })))
}
