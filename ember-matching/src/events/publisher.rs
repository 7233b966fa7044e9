use uuid::Uuid;

use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::types::event::{payloads, routing_keys, Event};

pub async fn publish_match_created(
    rabbitmq: &RabbitMQClient,
    match_id: Uuid,
    user_a_id: Uuid,
    user_b_id: Uuid,
) {
    let event = Event::new(
        "ember-matching",
        routing_keys::MATCHING_MATCH_CREATED,
        payloads::MatchCreated {
            match_id,
            user_a_id,
            user_b_id,
        },
    )
    .with_user(user_a_id)
    .with_correlation(match_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MATCHING_MATCH_CREATED, &event)
        .await
    {
        tracing::error!(error = %e, match_id = %match_id, "failed to publish match.created event");
    }
}

pub async fn publish_match_ended(
    rabbitmq: &RabbitMQClient,
    user_a_id: Uuid,
    user_b_id: Uuid,
    ended_by: Uuid,
) {
    let event = Event::new(
        "ember-matching",
        routing_keys::MATCHING_MATCH_ENDED,
        payloads::MatchEnded {
            user_a_id,
            user_b_id,
            ended_by,
        },
    )
    .with_user(ended_by);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MATCHING_MATCH_ENDED, &event)
        .await
    {
        tracing::error!(error = %e, "failed to publish match.ended event");
    }
}
