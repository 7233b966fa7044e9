use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Conversation, ConversationMember, NewConversation, NewConversationMember};
use crate::schema::{conversation_members, conversations, messages};

/// Canonical ordering of a pair, smaller id first.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub fn find(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Conversation>> {
    Ok(conversations::table.find(id).first(conn).optional()?)
}

/// Load a conversation together with the caller's membership.
pub fn load_for_member(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> AppResult<(Conversation, ConversationMember)> {
    let conversation = find(conn, conversation_id)?
        .ok_or_else(|| AppError::new(ErrorCode::ConversationNotFound, "conversation not found"))?;

    let member: ConversationMember = conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .filter(conversation_members::user_id.eq(user_id))
        .first(conn)
        .optional()?
        .ok_or_else(|| {
            AppError::new(
                ErrorCode::NotConversationMember,
                "you are not a member of this conversation",
            )
        })?;

    Ok((conversation, member))
}

pub fn ensure_active(conversation: &Conversation) -> AppResult<()> {
    if !conversation.is_active {
        return Err(AppError::new(
            ErrorCode::ConversationClosed,
            "this conversation has ended",
        ));
    }
    Ok(())
}

pub fn members(conn: &mut PgConnection, conversation_id: Uuid) -> AppResult<Vec<ConversationMember>> {
    Ok(conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .order(conversation_members::joined_at.asc())
        .load(conn)?)
}

pub fn member_ids(conn: &mut PgConnection, conversation_id: Uuid) -> AppResult<Vec<Uuid>> {
    Ok(conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .select(conversation_members::user_id)
        .load(conn)?)
}

/// Every conversation the user belongs to, with their membership row.
pub fn list_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Vec<(Conversation, ConversationMember)>> {
    let mut rows: Vec<(Conversation, ConversationMember)> = conversation_members::table
        .inner_join(conversations::table)
        .filter(conversation_members::user_id.eq(user_id))
        .select((conversations::all_columns, conversation_members::all_columns))
        .load(conn)?;

    rows.sort_by(|(a, _), (b, _)| b.last_activity().cmp(&a.last_activity()));
    Ok(rows)
}

/// Open the pair's conversation, or reactivate it if it already exists.
pub fn open_for_match(
    conn: &mut PgConnection,
    match_id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Conversation> {
    let (user_a_id, user_b_id) = ordered_pair(user_a, user_b);

    conn.transaction::<_, AppError, _>(|conn| {
        let conversation: Conversation = diesel::insert_into(conversations::table)
            .values(&NewConversation {
                match_id: Some(match_id),
                user_a_id,
                user_b_id,
                is_active: true,
            })
            .on_conflict((conversations::user_a_id, conversations::user_b_id))
            .do_update()
            .set((
                conversations::match_id.eq(Some(match_id)),
                conversations::is_active.eq(true),
                conversations::updated_at.eq(now),
            ))
            .get_result(conn)?;

        let members = vec![
            NewConversationMember { conversation_id: conversation.id, user_id: user_a_id },
            NewConversationMember { conversation_id: conversation.id, user_id: user_b_id },
        ];
        diesel::insert_into(conversation_members::table)
            .values(&members)
            .on_conflict((conversation_members::conversation_id, conversation_members::user_id))
            .do_nothing()
            .execute(conn)?;

        Ok(conversation)
    })
}

/// Mark the pair's conversation inactive, if there is one.
pub fn close_for_pair(
    conn: &mut PgConnection,
    user_a: Uuid,
    user_b: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Option<Conversation>> {
    let (user_a_id, user_b_id) = ordered_pair(user_a, user_b);

    Ok(diesel::update(
        conversations::table
            .filter(conversations::user_a_id.eq(user_a_id))
            .filter(conversations::user_b_id.eq(user_b_id)),
    )
    .set((
        conversations::is_active.eq(false),
        conversations::updated_at.eq(now),
    ))
    .get_result(conn)
    .optional()?)
}

/// Delete every conversation the user took part in. Members and messages cascade.
pub fn delete_for_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<usize> {
    Ok(diesel::delete(
        conversations::table.filter(
            conversations::user_a_id
                .eq(user_id)
                .or(conversations::user_b_id.eq(user_id)),
        ),
    )
    .execute(conn)?)
}

/// Mark the partner's messages read and reset the caller's counter.
/// Returns how many messages got a read receipt.
pub fn mark_read(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<usize> {
    conn.transaction::<_, AppError, _>(|conn| {
        let receipts = diesel::update(
            messages::table
                .filter(messages::conversation_id.eq(conversation_id))
                .filter(messages::sender_id.ne(user_id))
                .filter(messages::read_at.is_null()),
        )
        .set(messages::read_at.eq(now))
        .execute(conn)?;

        diesel::update(
            conversation_members::table
                .filter(conversation_members::conversation_id.eq(conversation_id))
                .filter(conversation_members::user_id.eq(user_id)),
        )
        .set((
            conversation_members::unread_count.eq(0),
            conversation_members::last_read_at.eq(now),
        ))
        .execute(conn)?;

        Ok(receipts)
    })
}

pub fn unread_total(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    let total: Option<i64> = conversation_members::table
        .filter(conversation_members::user_id.eq(user_id))
        .select(diesel::dsl::sum(conversation_members::unread_count))
        .first(conn)?;
    Ok(total.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_order_is_canonical() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
        let (lo, hi) = ordered_pair(a, b);
        assert!(lo <= hi);
    }
}
