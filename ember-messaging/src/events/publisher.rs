use uuid::Uuid;

use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::types::event::{payloads, routing_keys, Event};

use crate::models::Message;
use crate::rules;

pub async fn publish_message_sent(
    rabbitmq: &RabbitMQClient,
    message: &Message,
    recipient_ids: Vec<Uuid>,
) {
    let event = Event::new(
        "ember-messaging",
        routing_keys::MESSAGING_MESSAGE_SENT,
        payloads::MessageSent {
            message_id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            recipient_ids,
            content_preview: rules::preview_text(
                message.content.as_deref(),
                message.media_type.as_deref(),
            ),
        },
    )
    .with_user(message.sender_id)
    .with_correlation(message.conversation_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MESSAGING_MESSAGE_SENT, &event)
        .await
    {
        tracing::error!(error = %e, message_id = %message.id, "failed to publish message.sent event");
    }
}
