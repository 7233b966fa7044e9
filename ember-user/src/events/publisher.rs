use chrono::{DateTime, Utc};
use uuid::Uuid;

use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "ember-user";

pub async fn publish_profile_deleted(rabbitmq: &RabbitMQClient, user_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_PROFILE_DELETED,
        payloads::ProfileDeleted { user_id },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_PROFILE_DELETED, &event).await {
        tracing::error!(error = %e, user_id = %user_id, "failed to publish profile.deleted event");
    }
}

pub async fn publish_premium_updated(
    rabbitmq: &RabbitMQClient,
    user_id: Uuid,
    is_premium: bool,
    premium_until: Option<DateTime<Utc>>,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_PREMIUM_UPDATED,
        payloads::PremiumUpdated { user_id, is_premium, premium_until },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_PREMIUM_UPDATED, &event).await {
        tracing::error!(error = %e, user_id = %user_id, "failed to publish premium.updated event");
    }
}
