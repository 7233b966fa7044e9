use std::sync::Arc;

use serde::{Deserialize, Serialize};
use socketioxide::extract::{Data, SocketRef};
use uuid::Uuid;

use ember_shared::errors::AppResult;
use ember_shared::middleware::{jwt_secret, validate_jwt};

use crate::services::conversation_service;
use crate::socket::{push_to_others, user_room};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TypingPayload {
    pub conversation_id: Uuid,
    #[serde(default = "default_typing")]
    pub is_typing: bool,
}

fn default_typing() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct TypingEvent {
    conversation_id: Uuid,
    user_id: Uuid,
    is_typing: bool,
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

pub async fn on_connect(socket: SocketRef, state: Arc<AppState>) {
    let user_id = match authenticate_socket(&socket) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "messaging socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(user_id);
    socket.join(user_room(user_id)).ok();

    let sockets = state.connections.connect(user_id);
    metrics::gauge!("socket_online_users").set(state.connections.online_users() as f64);
    tracing::info!(user_id = %user_id, sid = %socket.id, sockets, "messaging socket connected");

    if let Err(e) = state.redis.mark_online(&user_id).await {
        tracing::warn!(error = %e, user_id = %user_id, "failed to set presence");
    }

    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));

    // Heartbeat refreshes the presence TTL
    socket.on("heartbeat", {
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                if let Some(user_id) = get_user_id(&socket) {
                    if let Err(e) = state.redis.mark_online(&user_id).await {
                        tracing::warn!(error = %e, user_id = %user_id, "failed to refresh presence");
                    }
                }
            }
        }
    });

    socket.on("typing", {
        let state = state.clone();
        move |socket: SocketRef, Data::<TypingPayload>(payload)| {
            let state = state.clone();
            async move { on_typing(socket, payload, &state) }
        }
    });

    socket.on_disconnect({
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move { on_disconnect(socket, state).await }
        }
    });
}

fn on_typing(socket: SocketRef, payload: TypingPayload, state: &Arc<AppState>) {
    let Some(user_id) = get_user_id(&socket) else {
        return;
    };

    let members = conversation_members(state, payload.conversation_id, user_id);

    match members {
        Ok(members) => push_to_others(
            &state.io,
            &members,
            user_id,
            "typing",
            &TypingEvent {
                conversation_id: payload.conversation_id,
                user_id,
                is_typing: payload.is_typing,
            },
        ),
        Err(e) => {
            tracing::debug!(error = %e, user_id = %user_id, "typing event ignored");
        }
    }
}

/// Members of a conversation, provided `user_id` is one of them.
fn conversation_members(state: &AppState, conversation_id: Uuid, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let mut conn = state.db.get()?;
    conversation_service::load_for_member(&mut conn, conversation_id, user_id)?;
    conversation_service::member_ids(&mut conn, conversation_id)
}

async fn on_disconnect(socket: SocketRef, state: Arc<AppState>) {
    let Some(user_id) = get_user_id(&socket) else {
        return;
    };

    let last = state.connections.disconnect(user_id);
    metrics::gauge!("socket_online_users").set(state.connections.online_users() as f64);
    tracing::info!(user_id = %user_id, sid = %socket.id, last, "messaging socket disconnected");

    if last {
        if let Err(e) = state.redis.mark_offline(&user_id).await {
            tracing::warn!(error = %e, user_id = %user_id, "failed to clear presence");
        }
    }
}

fn token_from_query(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "token" && !value.is_empty()).then_some(value)
    })
}

fn authenticate_socket(socket: &SocketRef) -> Result<Uuid, String> {
    let query = socket.req_parts().uri.query().unwrap_or_default();
    let token = token_from_query(query).ok_or_else(|| "missing token query parameter".to_string())?;

    let claims = validate_jwt(token, &jwt_secret()).map_err(|e| e.to_string())?;
    if claims.is_expired() {
        return Err("token has expired".into());
    }

    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_read_from_query() {
        assert_eq!(token_from_query("EIO=4&transport=websocket&token=abc.def"), Some("abc.def"));
        assert_eq!(token_from_query("token="), None);
        assert_eq!(token_from_query("EIO=4"), None);
    }

    #[test]
    fn typing_defaults_to_started() {
        let payload: TypingPayload =
            serde_json::from_value(serde_json::json!({ "conversation_id": Uuid::nil() })).unwrap();
        assert!(payload.is_typing);
    }
}
