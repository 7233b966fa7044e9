pub mod handlers;
pub mod presence;

use serde::Serialize;
use socketioxide::SocketIo;
use uuid::Uuid;

pub fn user_room(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// Emit `event` to each user's personal room.
pub fn push<T: Serialize>(io: &SocketIo, user_ids: &[Uuid], event: &'static str, payload: &T) {
    for user_id in user_ids {
        if let Err(e) = io.to(user_room(*user_id)).emit(event, payload) {
            tracing::warn!(error = %e, user_id = %user_id, event, "socket emit failed");
        }
    }
}

/// `push` to everyone in `members` except `actor`.
pub fn push_to_others<T: Serialize>(
    io: &SocketIo,
    members: &[Uuid],
    actor: Uuid,
    event: &'static str,
    payload: &T,
) {
    let others: Vec<Uuid> = members.iter().copied().filter(|m| *m != actor).collect();
    push(io, &others, event, payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_name_format() {
        assert_eq!(user_room(Uuid::nil()), "user:00000000-0000-0000-0000-000000000000");
    }
}
