use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use ember_shared::clients::storage;
use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::Message;

pub const MAX_CONTENT_CHARS: usize = 2000;
pub const PREVIEW_CHARS: usize = 100;
pub const MAX_EMOJI_CHARS: usize = 8;
pub const DELETED_PREVIEW: &str = "Message deleted";

/// Emoji to the users who reacted with it.
pub type Reactions = BTreeMap<String, Vec<Uuid>>;

/// Trim message text and check it against the length limit.
///
/// Blank text is dropped. A message needs text or media.
pub fn normalize_content(content: Option<&str>, has_media: bool) -> AppResult<Option<String>> {
    let text = content.map(str::trim).filter(|c| !c.is_empty());

    match text {
        None if !has_media => Err(AppError::new(
            ErrorCode::EmptyMessage,
            "message must have content or media",
        )),
        Some(t) if t.chars().count() > MAX_CONTENT_CHARS => Err(AppError::new(
            ErrorCode::MessageTooLong,
            format!("message must be at most {MAX_CONTENT_CHARS} characters"),
        )),
        other => Ok(other.map(str::to_string)),
    }
}

/// Conversation list preview for a message.
pub fn preview_text(content: Option<&str>, media_type: Option<&str>) -> String {
    if let Some(text) = content.filter(|c| !c.is_empty()) {
        return text.chars().take(PREVIEW_CHARS).collect();
    }
    match media_type {
        Some(t) if t.starts_with("image/") => "[photo]".into(),
        Some(t) if t.starts_with("video/") => "[video]".into(),
        _ => "[media]".into(),
    }
}

/// Extension for an uploadable chat attachment. Only images and video are accepted.
pub fn media_extension(content_type: &str) -> Option<&'static str> {
    if !(content_type.starts_with("image/") || content_type.starts_with("video/")) {
        return None;
    }
    storage::extension_for(content_type)
}

/// A linked attachment needs both its URL and an attachable content type.
pub fn attachment(media_url: Option<String>, media_type: Option<String>) -> AppResult<Option<(String, String)>> {
    let url = media_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    let kind = media_type.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

    match (url, kind) {
        (None, None) => Ok(None),
        (Some(url), Some(kind)) if media_extension(&kind).is_some() => Ok(Some((url, kind))),
        (Some(_), Some(_)) => Err(AppError::new(ErrorCode::ValidationError, "unsupported media type")),
        _ => Err(AppError::new(
            ErrorCode::ValidationError,
            "media_url and media_type must be sent together",
        )),
    }
}

pub fn validate_emoji(emoji: &str) -> AppResult<()> {
    let len = emoji.chars().count();
    if len == 0 || len > MAX_EMOJI_CHARS || emoji.chars().any(char::is_whitespace) {
        return Err(AppError::new(
            ErrorCode::InvalidReaction,
            format!("reaction must be 1 to {MAX_EMOJI_CHARS} characters without spaces"),
        ));
    }
    Ok(())
}

/// Add `user_id` under `emoji`, or remove it if already there.
/// Returns whether the reaction is now present.
pub fn toggle_reaction(reactions: &mut Reactions, emoji: &str, user_id: Uuid) -> bool {
    let users = reactions.entry(emoji.to_string()).or_default();
    let added = match users.iter().position(|u| *u == user_id) {
        Some(i) => {
            users.remove(i);
            false
        }
        None => {
            users.push(user_id);
            true
        }
    };
    if users.is_empty() {
        reactions.remove(emoji);
    }
    added
}

pub fn within_edit_window(created_at: DateTime<Utc>, now: DateTime<Utc>, window_minutes: i64) -> bool {
    now - created_at <= Duration::minutes(window_minutes)
}

/// Only the sender may edit, only a live message, only inside the window.
pub fn ensure_editable(
    message: &Message,
    user_id: Uuid,
    now: DateTime<Utc>,
    window_minutes: i64,
) -> AppResult<()> {
    if message.sender_id != user_id {
        return Err(AppError::new(
            ErrorCode::NotMessageSender,
            "you can only edit your own messages",
        ));
    }
    if message.is_deleted {
        return Err(AppError::new(ErrorCode::MessageDeleted, "message was deleted"));
    }
    if !within_edit_window(message.created_at, now, window_minutes) {
        return Err(AppError::with_details(
            ErrorCode::EditWindowExpired,
            "messages can only be edited shortly after sending",
            serde_json::json!({ "edit_window_minutes": window_minutes }),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn blank_text_without_media_is_rejected() {
        let err = normalize_content(Some("   "), false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::EmptyMessage));
        assert!(normalize_content(None, false).is_err());
    }

    #[test]
    fn media_only_message_has_no_text() {
        assert_eq!(normalize_content(Some("  "), true).unwrap(), None);
        assert_eq!(normalize_content(None, true).unwrap(), None);
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(normalize_content(Some("  hi  "), false).unwrap().as_deref(), Some("hi"));

        let at_limit = "é".repeat(MAX_CONTENT_CHARS);
        assert!(normalize_content(Some(&at_limit), false).is_ok());

        let over = "a".repeat(MAX_CONTENT_CHARS + 1);
        let err = normalize_content(Some(&over), false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MessageTooLong));
    }

    #[test]
    fn previews_fall_back_to_media_kind() {
        assert_eq!(preview_text(Some("hello"), None), "hello");
        assert_eq!(preview_text(None, Some("image/png")), "[photo]");
        assert_eq!(preview_text(None, Some("video/mp4")), "[video]");
        assert_eq!(preview_text(None, None), "[media]");
        assert_eq!(preview_text(Some(&"x".repeat(300)), None).chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn only_images_and_video_are_attachable() {
        assert_eq!(media_extension("image/jpeg"), Some("jpg"));
        assert_eq!(media_extension("video/webm"), Some("webm"));
        assert_eq!(media_extension("audio/mpeg"), None);
        assert_eq!(media_extension("image/tiff"), None);
    }

    #[test]
    fn attachment_needs_url_and_type() {
        let url = || Some("http://localhost:9000/ember-media/messages/a.jpg".to_string());

        assert_eq!(attachment(None, None).unwrap(), None);
        assert_eq!(
            attachment(url(), Some("image/jpeg".into())).unwrap(),
            Some((url().unwrap(), "image/jpeg".to_string()))
        );
        assert!(attachment(url(), None).is_err());
        assert!(attachment(url(), Some("  ".into())).is_err());
        assert!(attachment(None, Some("image/png".into())).is_err());
        assert!(attachment(url(), Some("application/pdf".into())).is_err());
    }

    #[test]
    fn emoji_bounds() {
        assert!(validate_emoji("❤️").is_ok());
        assert!(validate_emoji("👍🏽").is_ok());
        assert!(validate_emoji("").is_err());
        assert!(validate_emoji("a b").is_err());
        assert!(validate_emoji("123456789").is_err());
    }

    #[test]
    fn reaction_toggles_and_drops_empty_lists() {
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let mut reactions = Reactions::new();

        assert!(toggle_reaction(&mut reactions, "🔥", alice));
        assert!(toggle_reaction(&mut reactions, "🔥", bob));
        assert_eq!(reactions["🔥"], vec![alice, bob]);

        assert!(!toggle_reaction(&mut reactions, "🔥", alice));
        assert_eq!(reactions["🔥"], vec![bob]);

        assert!(!toggle_reaction(&mut reactions, "🔥", bob));
        assert!(!reactions.contains_key("🔥"));
    }

    #[test]
    fn edit_window_is_inclusive() {
        let sent = Utc::now();
        assert!(within_edit_window(sent, sent + Duration::minutes(15), 15));
        assert!(!within_edit_window(sent, sent + Duration::minutes(15) + Duration::seconds(1), 15));
    }

    #[test]
    fn edit_rules() {
        let sender = Uuid::now_v7();
        let sent = Utc::now();
        let msg = fixtures::message(sender, sent);

        assert!(ensure_editable(&msg, sender, sent + Duration::minutes(5), 15).is_ok());

        let err = ensure_editable(&msg, Uuid::now_v7(), sent, 15).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotMessageSender));

        let err = ensure_editable(&msg, sender, sent + Duration::minutes(16), 15).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::EditWindowExpired));

        let mut deleted = msg;
        deleted.is_deleted = true;
        let err = ensure_editable(&deleted, sender, sent, 15).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MessageDeleted));
    }
}
