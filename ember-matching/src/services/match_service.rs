use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use uuid::Uuid;

use ember_shared::errors::AppResult;

use crate::matching::reciprocity::{self, PairChange};
use crate::models::{Match, MatchStatus, NewMatch, NewSwipe, Swipe, SwipeAction};
use crate::schema::{matches, swipes};

/// Advisory lock key shared by both directions of a pair.
pub fn pair_lock_key(a: Uuid, b: Uuid) -> i64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let folded = lo.as_u128() ^ hi.as_u128().rotate_left(64);
    ((folded >> 64) as u64 ^ folded as u64) as i64
}

/// Serialize swipes within a pair until the current transaction ends.
pub fn lock_pair(conn: &mut PgConnection, a: Uuid, b: Uuid) -> AppResult<()> {
    diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
        .bind::<BigInt, _>(pair_lock_key(a, b))
        .execute(conn)?;
    Ok(())
}

pub struct RecordedSwipe {
    pub swipe: Swipe,
    pub change: PairChange,
    pub match_record: Option<Match>,
}

/// Store the swipe and settle the pair's match records. Call inside a transaction.
///
/// The pair lock is taken before the reciprocal swipe is read, so of two
/// crossing likes the second one always sees the first.
pub fn record_swipe(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    target_id: Uuid,
    action: SwipeAction,
    now: DateTime<Utc>,
) -> AppResult<RecordedSwipe> {
    lock_pair(conn, swiper_id, target_id)?;

    let swipe = upsert_swipe(conn, swiper_id, target_id, action, now)?;

    let reciprocal = find_swipe(conn, target_id, swiper_id)?.and_then(|sw| sw.action());
    let outgoing = find_match_for_update(conn, swiper_id, target_id)?;
    let incoming = find_match_for_update(conn, target_id, swiper_id)?;
    let change = reciprocity::decide(
        action,
        reciprocal,
        outgoing.as_ref().and_then(Match::status),
        incoming.as_ref().and_then(Match::status),
    );
    let written = apply_pair_change(conn, change, swiper_id, target_id, now)?;

    Ok(RecordedSwipe {
        swipe,
        change,
        match_record: written.or(outgoing),
    })
}

pub fn upsert_swipe(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    swiped_id: Uuid,
    action: SwipeAction,
    now: DateTime<Utc>,
) -> AppResult<Swipe> {
    Ok(diesel::insert_into(swipes::table)
        .values(&NewSwipe { swiper_id, swiped_id, action: action.as_str() })
        .on_conflict((swipes::swiper_id, swipes::swiped_id))
        .do_update()
        .set((swipes::action.eq(action.as_str()), swipes::updated_at.eq(now)))
        .get_result::<Swipe>(conn)?)
}

pub fn find_swipe(conn: &mut PgConnection, swiper_id: Uuid, swiped_id: Uuid) -> AppResult<Option<Swipe>> {
    Ok(swipes::table
        .filter(swipes::swiper_id.eq(swiper_id))
        .filter(swipes::swiped_id.eq(swiped_id))
        .first::<Swipe>(conn)
        .optional()?)
}

/// The directional match record `user_id → other_user_id`, locked for update.
pub fn find_match_for_update(conn: &mut PgConnection, user_id: Uuid, other_user_id: Uuid) -> AppResult<Option<Match>> {
    Ok(matches::table
        .filter(matches::user_id.eq(user_id))
        .filter(matches::other_user_id.eq(other_user_id))
        .for_update()
        .first::<Match>(conn)
        .optional()?)
}

fn upsert_direction(
    conn: &mut PgConnection,
    user_id: Uuid,
    other_user_id: Uuid,
    status: MatchStatus,
    initiated_by: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Match> {
    let matched_at = (status == MatchStatus::Mutual).then_some(now);
    Ok(diesel::insert_into(matches::table)
        .values(&NewMatch {
            user_id,
            other_user_id,
            status: status.as_str(),
            initiated_by,
            matched_at,
        })
        .on_conflict((matches::user_id, matches::other_user_id))
        .do_update()
        .set((
            matches::status.eq(status.as_str()),
            matches::matched_at.eq(matched_at),
            matches::updated_at.eq(now),
        ))
        .get_result::<Match>(conn)?)
}

/// Write a [`PairChange`] for the swiper. Returns the swiper's record when one was written.
pub fn apply_pair_change(
    conn: &mut PgConnection,
    change: PairChange,
    swiper_id: Uuid,
    target_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Option<Match>> {
    match change {
        PairChange::Unchanged => Ok(None),
        PairChange::Pending => {
            upsert_direction(conn, swiper_id, target_id, MatchStatus::Pending, swiper_id, now).map(Some)
        }
        PairChange::Matched => {
            // The target liked first.
            upsert_direction(conn, target_id, swiper_id, MatchStatus::Mutual, target_id, now)?;
            upsert_direction(conn, swiper_id, target_id, MatchStatus::Mutual, target_id, now).map(Some)
        }
        PairChange::Rejected => {
            upsert_direction(conn, target_id, swiper_id, MatchStatus::Rejected, target_id, now)?;
            upsert_direction(conn, swiper_id, target_id, MatchStatus::Rejected, target_id, now).map(Some)
        }
    }
}

/// Mark both directions of a mutual pair unmatched. `None` when the pair is not mutual.
pub fn unmatch(conn: &mut PgConnection, user_id: Uuid, other_user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<usize>> {
    let Some(current) = find_match_for_update(conn, user_id, other_user_id)? else {
        return Ok(None);
    };
    if current.status() != Some(MatchStatus::Mutual) {
        return Ok(None);
    }

    let updated = diesel::update(
        matches::table.filter(
            matches::user_id
                .eq(user_id)
                .and(matches::other_user_id.eq(other_user_id))
                .or(matches::user_id.eq(other_user_id).and(matches::other_user_id.eq(user_id))),
        ),
    )
    .set((
        matches::status.eq(MatchStatus::Unmatched.as_str()),
        matches::updated_at.eq(now),
    ))
    .execute(conn)?;

    Ok(Some(updated))
}

/// Everyone the user has swiped on or shares a match record with.
pub fn excluded_ids(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let mut ids: Vec<Uuid> = swipes::table
        .filter(swipes::swiper_id.eq(user_id))
        .select(swipes::swiped_id)
        .load(conn)?;

    let counterparts: Vec<Uuid> = matches::table
        .filter(matches::user_id.eq(user_id))
        .select(matches::other_user_id)
        .load(conn)?;

    ids.extend(counterparts);
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Remove every swipe and match record involving the user.
pub fn purge_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<(usize, usize)> {
    conn.transaction::<_, ember_shared::AppError, _>(|conn| {
        let swipes_deleted = diesel::delete(
            swipes::table.filter(swipes::swiper_id.eq(user_id).or(swipes::swiped_id.eq(user_id))),
        )
        .execute(conn)?;

        let matches_deleted = diesel::delete(
            matches::table.filter(matches::user_id.eq(user_id).or(matches::other_user_id.eq(user_id))),
        )
        .execute(conn)?;

        Ok((swipes_deleted, matches_deleted))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::connection::SimpleConnection;
    use std::sync::{Arc, Barrier};

    const MIGRATION: &str = include_str!("../../migrations/2025-01-11-000000_create_matching/up.sql");

    #[test]
    fn pair_lock_key_ignores_direction() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(pair_lock_key(a, b), pair_lock_key(b, a));
        assert_ne!(pair_lock_key(a, b), pair_lock_key(a, Uuid::now_v7()));
    }

    fn connect(url: &str, schema: &str) -> PgConnection {
        let mut conn = PgConnection::establish(url).unwrap();
        conn.batch_execute(&format!("SET search_path TO {schema}")).unwrap();
        conn
    }

    /// Needs a scratch Postgres in `EMBER_MATCHING_TEST_DATABASE_URL`; skipped otherwise.
    #[test]
    fn crossing_likes_end_mutual() {
        let Ok(url) = std::env::var("EMBER_MATCHING_TEST_DATABASE_URL") else {
            eprintln!("EMBER_MATCHING_TEST_DATABASE_URL not set, skipping");
            return;
        };
        let schema = format!("swipes_{}", Uuid::now_v7().simple());
        let mut admin = PgConnection::establish(&url).unwrap();
        admin
            .batch_execute(&format!("CREATE SCHEMA {schema}; SET search_path TO {schema}; {MIGRATION}"))
            .unwrap();

        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(alice, bob), (bob, alice)]
            .into_iter()
            .map(|(swiper, target)| {
                let (url, schema, barrier) = (url.clone(), schema.clone(), barrier.clone());
                std::thread::spawn(move || {
                    let mut conn = connect(&url, &schema);
                    barrier.wait();
                    conn.transaction::<_, ember_shared::AppError, _>(|conn| {
                        record_swipe(conn, swiper, target, SwipeAction::Like, Utc::now())
                    })
                    .map(|r| r.change)
                    .unwrap()
                })
            })
            .collect();
        let mut changes: Vec<PairChange> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        changes.sort_by_key(|c| *c == PairChange::Matched);

        let statuses: Vec<String> = matches::table
            .select(matches::status)
            .order(matches::user_id)
            .load(&mut admin)
            .unwrap();
        admin.batch_execute(&format!("DROP SCHEMA {schema} CASCADE")).unwrap();

        assert_eq!(changes, vec![PairChange::Pending, PairChange::Matched]);
        assert_eq!(statuses, vec!["mutual", "mutual"]);
    }
}
