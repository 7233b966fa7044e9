use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `ember.{domain}.{entity}.{action}`
/// Example: `ember.matching.match.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // User events
    pub const USER_PROFILE_DELETED: &str = "ember.user.profile.deleted";
    pub const USER_PREMIUM_UPDATED: &str = "ember.user.premium.updated";

    // Matching events
    pub const MATCHING_MATCH_CREATED: &str = "ember.matching.match.created";
    pub const MATCHING_MATCH_ENDED: &str = "ember.matching.match.ended";

    // Messaging events
    pub const MESSAGING_MESSAGE_SENT: &str = "ember.messaging.message.sent";
}

/// Common event data payloads
pub mod payloads {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileDeleted {
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PremiumUpdated {
        pub user_id: Uuid,
        pub is_premium: bool,
        pub premium_until: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchEnded {
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
        pub ended_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MessageSent {
        pub message_id: Uuid,
        pub conversation_id: Uuid,
        pub sender_id: Uuid,
        pub recipient_ids: Vec<Uuid>,
        pub content_preview: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_user_and_payload() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let event = Event::new(
            "ember-matching",
            routing_keys::MATCHING_MATCH_CREATED,
            payloads::MatchCreated { match_id: Uuid::now_v7(), user_a_id: a, user_b_id: b },
        )
        .with_user(a);

        let bytes = serde_json::to_vec(&event).unwrap();
        let back: Event<payloads::MatchCreated> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.user_id, Some(a));
        assert_eq!(back.data.user_b_id, b);
        assert_eq!(back.event_type, "ember.matching.match.created");
    }
}
