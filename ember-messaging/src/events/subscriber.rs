use std::sync::Arc;

use chrono::Utc;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;
use serde::de::DeserializeOwned;
use serde::Serialize;

use ember_shared::errors::AppResult;
use ember_shared::types::event::{payloads, routing_keys, Event};

use crate::services::conversation_service;
use crate::socket;
use crate::AppState;

/// Consume one routing key, handing each decoded payload to `handle`.
/// Every delivery is acked, including ones that fail to decode or apply.
async fn consume<T, F>(
    state: Arc<AppState>,
    queue: &str,
    routing_key: &'static str,
    handle: F,
) -> anyhow::Result<()>
where
    T: Serialize + DeserializeOwned,
    F: Fn(&AppState, T) -> AppResult<()>,
{
    let mut consumer = state.rabbitmq.subscribe(queue, &[routing_key]).await?;

    tracing::info!(routing_key, "listening for events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<T>>(&delivery.data) {
                    Ok(event) => {
                        if let Err(e) = handle(&state, event.data) {
                            tracing::error!(error = %e, routing_key, event_id = %event.id, "failed to apply event");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, routing_key, "failed to deserialize event");
                    }
                }
                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}

/// Open (or reopen) the conversation of every new match.
pub async fn listen_match_created(state: Arc<AppState>) -> anyhow::Result<()> {
    consume(
        state,
        "ember-messaging.matching.match.created",
        routing_keys::MATCHING_MATCH_CREATED,
        |state, data: payloads::MatchCreated| {
            let mut conn = state.db.get()?;
            let conversation = conversation_service::open_for_match(
                &mut conn,
                data.match_id,
                data.user_a_id,
                data.user_b_id,
                Utc::now(),
            )?;

            socket::push(
                &state.io,
                &[data.user_a_id, data.user_b_id],
                "conversation_opened",
                &conversation,
            );
            tracing::info!(
                conversation_id = %conversation.id,
                match_id = %data.match_id,
                "conversation opened for match"
            );
            Ok(())
        },
    )
    .await
}

/// Close the conversation when a match ends. History stays readable.
pub async fn listen_match_ended(state: Arc<AppState>) -> anyhow::Result<()> {
    consume(
        state,
        "ember-messaging.matching.match.ended",
        routing_keys::MATCHING_MATCH_ENDED,
        |state, data: payloads::MatchEnded| {
            let mut conn = state.db.get()?;
            match conversation_service::close_for_pair(&mut conn, data.user_a_id, data.user_b_id, Utc::now())? {
                Some(conversation) => {
                    socket::push(
                        &state.io,
                        &[data.user_a_id, data.user_b_id],
                        "conversation_closed",
                        &serde_json::json!({ "conversation_id": conversation.id }),
                    );
                    tracing::info!(conversation_id = %conversation.id, ended_by = %data.ended_by, "conversation closed");
                }
                None => {
                    tracing::debug!(user_a = %data.user_a_id, user_b = %data.user_b_id, "no conversation to close");
                }
            }
            Ok(())
        },
    )
    .await
}

/// Remove all conversations of a deleted profile.
pub async fn listen_profile_deleted(state: Arc<AppState>) -> anyhow::Result<()> {
    consume(
        state,
        "ember-messaging.user.profile.deleted",
        routing_keys::USER_PROFILE_DELETED,
        |state, data: payloads::ProfileDeleted| {
            let mut conn = state.db.get()?;
            let removed = conversation_service::delete_for_user(&mut conn, data.user_id)?;
            tracing::info!(user_id = %data.user_id, conversations = removed, "conversations purged for deleted profile");
            Ok(())
        },
    )
    .await
}
