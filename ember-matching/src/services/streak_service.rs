use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult};

use crate::matching::streak;
use crate::models::Streak;
use crate::schema::streaks;

/// Lock the user's streak row for the rest of the transaction, creating it first if needed.
pub fn load_for_update(conn: &mut PgConnection, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Streak> {
    diesel::insert_into(streaks::table)
        .values(&streak::new_streak(user_id, now))
        .on_conflict(streaks::user_id)
        .do_nothing()
        .execute(conn)?;

    Ok(streaks::table
        .find(user_id)
        .for_update()
        .first::<Streak>(conn)?)
}

pub fn save(conn: &mut PgConnection, streak: &Streak, now: DateTime<Utc>) -> AppResult<Streak> {
    let mut changed = streak.clone();
    changed.updated_at = now;
    Ok(diesel::update(streaks::table.find(streak.user_id))
        .set(&changed)
        .get_result::<Streak>(conn)?)
}

/// Current streak with counters rolled over, persisted when anything changed.
pub fn current(conn: &mut PgConnection, user_id: Uuid, now: DateTime<Utc>, check_in: bool) -> AppResult<Streak> {
    conn.transaction::<_, AppError, _>(|conn| {
        let mut s = load_for_update(conn, user_id, now)?;
        let before = s.clone();
        streak::roll_over(&mut s, now);
        if check_in {
            streak::record_activity(&mut s, now.date_naive());
        }
        if s == before {
            Ok(s)
        } else {
            save(conn, &s, now)
        }
    })
}

pub fn delete(conn: &mut PgConnection, user_id: Uuid) -> AppResult<usize> {
    Ok(diesel::delete(streaks::table.find(user_id)).execute(conn)?)
}
