use std::sync::Arc;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use ember_shared::errors::AppResult;
use ember_shared::types::event::{payloads, routing_keys, Event};

use crate::services::{match_service, streak_service};
use crate::AppState;

/// Purge swipes, matches and streaks of deleted profiles.
pub async fn listen_profile_deleted(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state
        .rabbitmq
        .subscribe(
            "ember-matching.user.profile.deleted",
            &[routing_keys::USER_PROFILE_DELETED],
        )
        .await?;

    tracing::info!("listening for user.profile.deleted events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::ProfileDeleted>>(&delivery.data) {
                    Ok(event) => {
                        let user_id = event.data.user_id;
                        match purge(&state, user_id) {
                            Ok((swipes, matches)) => {
                                tracing::info!(
                                    user_id = %user_id,
                                    swipes,
                                    matches,
                                    "matching data purged for deleted profile"
                                );
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    user_id = %user_id,
                                    "failed to purge matching data"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize profile.deleted event");
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

fn purge(state: &AppState, user_id: uuid::Uuid) -> AppResult<(usize, usize)> {
    let mut conn = state.db.get()?;
    let counts = match_service::purge_user(&mut conn, user_id)?;
    streak_service::delete(&mut conn, user_id)?;
    Ok(counts)
}
