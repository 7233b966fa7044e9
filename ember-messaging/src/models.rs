use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::rules::Reactions;
use crate::schema::{conversation_members, conversations, messages};

// --- Conversation ---

/// A matched pair's conversation. `user_a_id < user_b_id` always holds.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub match_id: Option<Uuid>,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub is_active: bool,
    pub last_message_text: Option<String>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn partner_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a_id == user_id {
            Some(self.user_b_id)
        } else if self.user_b_id == user_id {
            Some(self.user_a_id)
        } else {
            None
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversations)]
pub struct NewConversation {
    pub match_id: Option<Uuid>,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub is_active: bool,
}

// --- ConversationMember ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversation_members)]
pub struct ConversationMember {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub unread_count: i32,
    pub last_read_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversation_members)]
pub struct NewConversationMember {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub reactions: serde_json::Value,
    pub is_deleted: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Stored reactions; malformed JSON reads as none.
    pub fn reaction_map(&self) -> Reactions {
        serde_json::from_value(self.reactions.clone()).unwrap_or_default()
    }

    /// Deleted messages never expose content, media, or reactions.
    pub fn redacted(mut self) -> Self {
        if self.is_deleted {
            self.content = None;
            self.media_url = None;
            self.media_type = None;
            self.reactions = serde_json::json!({});
        }
        self
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn message(sender_id: Uuid, created_at: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            sender_id,
            content: Some("hey there".into()),
            media_url: None,
            media_type: None,
            reactions: serde_json::json!({}),
            is_deleted: false,
            edited_at: None,
            read_at: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_is_the_other_side() {
        let now = Utc::now();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let conv = Conversation {
            id: Uuid::now_v7(),
            match_id: None,
            user_a_id: a,
            user_b_id: b,
            is_active: true,
            last_message_text: None,
            last_message_sender_id: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(conv.partner_of(a), Some(b));
        assert_eq!(conv.partner_of(b), Some(a));
        assert_eq!(conv.partner_of(Uuid::now_v7()), None);
        assert_eq!(conv.last_activity(), now);
    }

    #[test]
    fn redaction_only_touches_deleted_messages() {
        let mut msg = fixtures::message(Uuid::now_v7(), Utc::now());
        msg.media_url = Some("http://cdn/x.jpg".into());
        msg.reactions = serde_json::json!({ "🔥": [Uuid::now_v7()] });

        let kept = msg.clone().redacted();
        assert_eq!(kept.content.as_deref(), Some("hey there"));

        msg.is_deleted = true;
        let blanked = msg.redacted();
        assert!(blanked.content.is_none());
        assert!(blanked.media_url.is_none());
        assert!(blanked.reaction_map().is_empty());
    }

    #[test]
    fn malformed_reactions_read_as_empty() {
        let mut msg = fixtures::message(Uuid::now_v7(), Utc::now());
        msg.reactions = serde_json::json!(["not", "a", "map"]);
        assert!(msg.reaction_map().is_empty());
    }
}
