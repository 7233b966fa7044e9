use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::pagination::PaginationParams;

use crate::models::{Conversation, Message, NewMessage};
use crate::rules::{self, DELETED_PREVIEW};
use crate::schema::{conversation_members, conversations, messages};
use crate::services::conversation_service;

/// A freshly stored message and who should hear about it.
pub struct Sent {
    pub message: Message,
    pub recipients: Vec<Uuid>,
}

/// Outcome of a message mutation that other members are told about.
pub struct Changed {
    pub message: Message,
    pub members: Vec<Uuid>,
}

fn require(conn: &mut PgConnection, message_id: Uuid) -> AppResult<Message> {
    messages::table
        .find(message_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MessageNotFound, "message not found"))
}

fn lock_conversation(conn: &mut PgConnection, conversation_id: Uuid) -> AppResult<Conversation> {
    conversations::table
        .find(conversation_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ConversationNotFound, "conversation not found"))
}

fn is_latest(conn: &mut PgConnection, message: &Message) -> AppResult<bool> {
    let latest: Option<Uuid> = messages::table
        .filter(messages::conversation_id.eq(message.conversation_id))
        .order((messages::created_at.desc(), messages::id.desc()))
        .select(messages::id)
        .first(conn)
        .optional()?;
    Ok(latest == Some(message.id))
}

fn set_preview(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    text: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    diesel::update(conversations::table.find(conversation_id))
        .set((
            conversations::last_message_text.eq(Some(text)),
            conversations::updated_at.eq(now),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn list(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    params: &PaginationParams,
) -> AppResult<(Vec<Message>, i64)> {
    let query = messages::table.filter(messages::conversation_id.eq(conversation_id));

    let total: i64 = query.clone().count().get_result(conn)?;
    let rows: Vec<Message> = query
        .order((messages::created_at.desc(), messages::id.desc()))
        .offset(params.offset())
        .limit(params.limit())
        .load(conn)?;

    Ok((rows.into_iter().map(Message::redacted).collect(), total))
}

/// Store a message, refresh the conversation preview and bump every other
/// member's unread counter, all in one transaction.
pub fn send(conn: &mut PgConnection, new: NewMessage, now: DateTime<Utc>) -> AppResult<Sent> {
    conn.transaction::<_, AppError, _>(|conn| {
        let conversation = lock_conversation(conn, new.conversation_id)?;
        conversation_service::ensure_active(&conversation)?;

        let message: Message = diesel::insert_into(messages::table)
            .values(&new)
            .get_result(conn)?;

        let preview = rules::preview_text(message.content.as_deref(), message.media_type.as_deref());
        diesel::update(conversations::table.find(conversation.id))
            .set((
                conversations::last_message_text.eq(Some(preview)),
                conversations::last_message_sender_id.eq(Some(message.sender_id)),
                conversations::last_message_at.eq(Some(message.created_at)),
                conversations::updated_at.eq(now),
            ))
            .execute(conn)?;

        let recipients: Vec<Uuid> = diesel::update(
            conversation_members::table
                .filter(conversation_members::conversation_id.eq(conversation.id))
                .filter(conversation_members::user_id.ne(message.sender_id)),
        )
        .set(conversation_members::unread_count.eq(conversation_members::unread_count + 1))
        .returning(conversation_members::user_id)
        .get_results(conn)?;

        Ok(Sent { message, recipients })
    })
}

pub fn edit(
    conn: &mut PgConnection,
    message_id: Uuid,
    user_id: Uuid,
    content: Option<&str>,
    now: DateTime<Utc>,
    window_minutes: i64,
) -> AppResult<Changed> {
    conn.transaction::<_, AppError, _>(|conn| {
        let existing = require(conn, message_id)?;
        rules::ensure_editable(&existing, user_id, now, window_minutes)?;

        let conversation = lock_conversation(conn, existing.conversation_id)?;
        conversation_service::ensure_active(&conversation)?;

        let text = rules::normalize_content(content, existing.media_url.is_some())?;

        let message: Message = diesel::update(messages::table.find(message_id))
            .set((
                messages::content.eq(text),
                messages::edited_at.eq(Some(now)),
            ))
            .get_result(conn)?;

        if is_latest(conn, &message)? {
            let preview = rules::preview_text(message.content.as_deref(), message.media_type.as_deref());
            set_preview(conn, conversation.id, &preview, now)?;
        }

        let members = conversation_service::member_ids(conn, conversation.id)?;
        Ok(Changed { message, members })
    })
}

pub struct Deleted {
    pub changed: Changed,
    /// `false` when the message was already deleted.
    pub deleted_now: bool,
    /// Attachment URL the message held, for removal from storage.
    pub removed_media: Option<String>,
}

/// Soft delete by the sender. Deleting twice is a no-op.
pub fn soft_delete(
    conn: &mut PgConnection,
    message_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Deleted> {
    conn.transaction::<_, AppError, _>(|conn| {
        let existing = require(conn, message_id)?;
        if existing.sender_id != user_id {
            return Err(AppError::new(
                ErrorCode::NotMessageSender,
                "you can only delete your own messages",
            ));
        }

        let members = conversation_service::member_ids(conn, existing.conversation_id)?;
        if existing.is_deleted {
            return Ok(Deleted {
                changed: Changed { message: existing.redacted(), members },
                deleted_now: false,
                removed_media: None,
            });
        }

        let message: Message = diesel::update(messages::table.find(message_id))
            .set((
                messages::is_deleted.eq(true),
                messages::content.eq(None::<String>),
                messages::media_url.eq(None::<String>),
                messages::media_type.eq(None::<String>),
                messages::reactions.eq(serde_json::json!({})),
            ))
            .get_result(conn)?;

        if is_latest(conn, &message)? {
            set_preview(conn, message.conversation_id, DELETED_PREVIEW, now)?;
        }

        Ok(Deleted {
            changed: Changed { message, members },
            deleted_now: true,
            removed_media: existing.media_url,
        })
    })
}

/// Toggle the caller's reaction. Returns whether it is now present.
pub fn toggle_reaction(
    conn: &mut PgConnection,
    message_id: Uuid,
    user_id: Uuid,
    emoji: &str,
) -> AppResult<(Changed, bool)> {
    rules::validate_emoji(emoji)?;

    conn.transaction::<_, AppError, _>(|conn| {
        let existing = require(conn, message_id)?;
        let (conversation, _) =
            conversation_service::load_for_member(conn, existing.conversation_id, user_id)?;
        conversation_service::ensure_active(&conversation)?;

        if existing.is_deleted {
            return Err(AppError::new(ErrorCode::MessageDeleted, "message was deleted"));
        }

        let mut reactions = existing.reaction_map();
        let added = rules::toggle_reaction(&mut reactions, emoji, user_id);
        let value = serde_json::to_value(&reactions).map_err(|e| AppError::Internal(e.into()))?;

        let message: Message = diesel::update(messages::table.find(message_id))
            .set(messages::reactions.eq(value))
            .get_result(conn)?;

        let members = conversation_service::member_ids(conn, conversation.id)?;
        Ok((Changed { message, members }, added))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::connection::SimpleConnection;

    const MIGRATION: &str = include_str!("../../migrations/2025-01-12-000000_create_messaging/up.sql");

    /// Needs a scratch Postgres in `EMBER_MESSAGING_TEST_DATABASE_URL`; skipped otherwise.
    #[test]
    fn deleting_a_media_message_releases_its_attachment_once() {
        let Ok(url) = std::env::var("EMBER_MESSAGING_TEST_DATABASE_URL") else {
            eprintln!("EMBER_MESSAGING_TEST_DATABASE_URL not set, skipping");
            return;
        };
        let schema = format!("messages_{}", Uuid::now_v7().simple());
        let mut conn = PgConnection::establish(&url).unwrap();
        conn.batch_execute(&format!("CREATE SCHEMA {schema}; SET search_path TO {schema}; {MIGRATION}"))
            .unwrap();

        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let now = Utc::now();
        let conversation =
            conversation_service::open_for_match(&mut conn, Uuid::now_v7(), alice, bob, now).unwrap();
        let media = "http://localhost:9000/ember-media/messages/a.jpg".to_string();
        let sent = send(
            &mut conn,
            NewMessage {
                conversation_id: conversation.id,
                sender_id: alice,
                content: None,
                media_url: Some(media.clone()),
                media_type: Some("image/jpeg".into()),
            },
            now,
        )
        .unwrap();

        let first = soft_delete(&mut conn, sent.message.id, alice, now).unwrap();
        let second = soft_delete(&mut conn, sent.message.id, alice, now).unwrap();
        conn.batch_execute(&format!("DROP SCHEMA {schema} CASCADE")).unwrap();

        assert!(first.deleted_now);
        assert_eq!(first.removed_media, Some(media));
        assert_eq!(first.changed.message.media_url, None);
        assert!(!second.deleted_now);
        assert_eq!(second.removed_media, None);
    }
}
