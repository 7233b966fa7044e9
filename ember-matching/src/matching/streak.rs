//! Daily activity streaks and the like allowance they unlock.
//!
//! Days are UTC calendar days. Usage counters reset at the first UTC
//! midnight after the previous reset.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Streak, SwipeAction};

pub const FREE_SUPERLIKES: i32 = 1;
pub const PREMIUM_SUPERLIKES: i32 = 5;

/// Bonus likes per day for keeping a streak alive.
pub fn calculate_streak_bonus(streak_days: i32) -> i32 {
    match streak_days {
        d if d >= 30 => 25,
        d if d >= 14 => 15,
        d if d >= 7 => 10,
        d if d >= 3 => 5,
        _ => 0,
    }
}

/// Likes allowed today, `None` meaning unlimited.
pub fn calculate_total_allowed_likes(streak_days: i32, is_premium: bool, free_daily_likes: i32) -> Option<i32> {
    if is_premium {
        None
    } else {
        Some(free_daily_likes + calculate_streak_bonus(streak_days))
    }
}

pub fn superlike_allowance(is_premium: bool) -> i32 {
    if is_premium { PREMIUM_SUPERLIKES } else { FREE_SUPERLIKES }
}

/// First UTC midnight strictly after `now`.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow.and_time(NaiveTime::default()).and_utc()
}

pub fn new_streak(user_id: Uuid, now: DateTime<Utc>) -> Streak {
    Streak {
        user_id,
        current_streak: 0,
        longest_streak: 0,
        last_active_date: None,
        likes_used: 0,
        superlikes_used: 0,
        likes_reset_at: next_reset(now),
        updated_at: now,
    }
}

/// Zero the usage counters once the reset time has passed. Returns whether it did.
pub fn roll_over(streak: &mut Streak, now: DateTime<Utc>) -> bool {
    if now < streak.likes_reset_at {
        return false;
    }
    streak.likes_used = 0;
    streak.superlikes_used = 0;
    streak.likes_reset_at = next_reset(now);
    true
}

/// Count `today` as active. Consecutive days extend the streak, gaps restart it.
pub fn record_activity(streak: &mut Streak, today: NaiveDate) {
    match streak.last_active_date {
        Some(last) if last == today => return,
        Some(last) if last.succ_opt() == Some(today) => streak.current_streak += 1,
        _ => streak.current_streak = 1,
    }
    streak.last_active_date = Some(today);
    streak.longest_streak = streak.longest_streak.max(streak.current_streak);
}

/// Streak as shown to the user: a streak not continued since yesterday is broken.
pub fn effective_streak(streak: &Streak, today: NaiveDate) -> i32 {
    match streak.last_active_date {
        Some(last) if last == today || last.succ_opt() == Some(today) => streak.current_streak,
        _ => 0,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Allowance {
    pub allowed_likes: Option<i32>,
    pub likes_remaining: Option<i32>,
    pub superlikes_allowed: i32,
    pub superlikes_remaining: i32,
}

pub fn allowance(streak: &Streak, is_premium: bool, free_daily_likes: i32, today: NaiveDate) -> Allowance {
    let allowed_likes =
        calculate_total_allowed_likes(effective_streak(streak, today), is_premium, free_daily_likes);
    let superlikes_allowed = superlike_allowance(is_premium);
    Allowance {
        allowed_likes,
        likes_remaining: allowed_likes.map(|n| (n - streak.likes_used).max(0)),
        superlikes_allowed,
        superlikes_remaining: (superlikes_allowed - streak.superlikes_used).max(0),
    }
}

/// Refuse a swipe the allowance has no room for. Passes are never limited.
pub fn check_swipe(action: SwipeAction, allowance: &Allowance, resets_at: DateTime<Utc>) -> AppResult<()> {
    let (code, message) = match action {
        SwipeAction::Like if allowance.likes_remaining == Some(0) => {
            (ErrorCode::DailyLikeLimitReached, "daily like limit reached")
        }
        SwipeAction::Superlike if allowance.superlikes_remaining == 0 => {
            (ErrorCode::DailySuperLikeLimitReached, "daily superlike limit reached")
        }
        _ => return Ok(()),
    };
    Err(AppError::with_details(
        code,
        message,
        serde_json::json!({ "likes_reset_at": resets_at }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn streak_at(now: DateTime<Utc>) -> Streak {
        new_streak(Uuid::now_v7(), now)
    }

    #[test]
    fn bonus_thresholds() {
        assert_eq!(calculate_streak_bonus(0), 0);
        assert_eq!(calculate_streak_bonus(2), 0);
        assert_eq!(calculate_streak_bonus(3), 5);
        assert_eq!(calculate_streak_bonus(6), 5);
        assert_eq!(calculate_streak_bonus(7), 10);
        assert_eq!(calculate_streak_bonus(14), 15);
        assert_eq!(calculate_streak_bonus(29), 15);
        assert_eq!(calculate_streak_bonus(30), 25);
        assert_eq!(calculate_streak_bonus(365), 25);
    }

    #[test]
    fn premium_is_unlimited() {
        assert_eq!(calculate_total_allowed_likes(0, true, 25), None);
        assert_eq!(calculate_total_allowed_likes(0, false, 25), Some(25));
        assert_eq!(calculate_total_allowed_likes(7, false, 25), Some(35));
    }

    #[test]
    fn reset_is_next_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(next_reset(now), Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        let midnight = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(next_reset(midnight), Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn counters_roll_over_after_reset() {
        let start = Utc.with_ymd_and_hms(2025, 3, 9, 10, 0, 0).unwrap();
        let mut s = streak_at(start);
        s.likes_used = 20;
        s.superlikes_used = 1;

        assert!(!roll_over(&mut s, start + Duration::hours(5)));
        assert_eq!(s.likes_used, 20);

        let next_day = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert!(roll_over(&mut s, next_day));
        assert_eq!((s.likes_used, s.superlikes_used), (0, 0));
        assert_eq!(s.likes_reset_at, Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut s = streak_at(Utc::now());
        record_activity(&mut s, day(2025, 3, 1));
        record_activity(&mut s, day(2025, 3, 1));
        assert_eq!(s.current_streak, 1);
        record_activity(&mut s, day(2025, 3, 2));
        record_activity(&mut s, day(2025, 3, 3));
        assert_eq!(s.current_streak, 3);
        assert_eq!(s.longest_streak, 3);
    }

    #[test]
    fn gap_restarts_streak_but_keeps_longest() {
        let mut s = streak_at(Utc::now());
        for d in 1..=5 {
            record_activity(&mut s, day(2025, 3, d));
        }
        record_activity(&mut s, day(2025, 3, 8));
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 5);
    }

    #[test]
    fn month_boundary_is_consecutive() {
        let mut s = streak_at(Utc::now());
        record_activity(&mut s, day(2025, 2, 28));
        record_activity(&mut s, day(2025, 3, 1));
        assert_eq!(s.current_streak, 2);
    }

    #[test]
    fn stale_streak_reads_as_zero() {
        let mut s = streak_at(Utc::now());
        record_activity(&mut s, day(2025, 3, 1));
        record_activity(&mut s, day(2025, 3, 2));
        assert_eq!(effective_streak(&s, day(2025, 3, 3)), 2);
        assert_eq!(effective_streak(&s, day(2025, 3, 4)), 0);
    }

    #[test]
    fn allowance_counts_down() {
        let mut s = streak_at(Utc::now());
        for d in 1..=7 {
            record_activity(&mut s, day(2025, 3, d));
        }
        s.likes_used = 30;
        s.superlikes_used = 1;

        let free = allowance(&s, false, 25, day(2025, 3, 7));
        assert_eq!(free.allowed_likes, Some(35));
        assert_eq!(free.likes_remaining, Some(5));
        assert_eq!(free.superlikes_remaining, 0);

        let premium = allowance(&s, true, 25, day(2025, 3, 7));
        assert_eq!(premium.likes_remaining, None);
        assert_eq!(premium.superlikes_remaining, 4);
    }

    fn used(likes: i32, superlikes: i32) -> Streak {
        let mut s = streak_at(Utc::now());
        s.likes_used = likes;
        s.superlikes_used = superlikes;
        s
    }

    #[test]
    fn likes_stop_at_the_allowance() {
        let today = Utc::now().date_naive();
        let resets_at = next_reset(Utc::now());

        let one_left = allowance(&used(24, 0), false, 25, today);
        assert!(check_swipe(SwipeAction::Like, &one_left, resets_at).is_ok());

        let none_left = allowance(&used(25, 0), false, 25, today);
        let err = check_swipe(SwipeAction::Like, &none_left, resets_at).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::DailyLikeLimitReached));

        let premium = allowance(&used(10_000, 0), true, 25, today);
        assert!(check_swipe(SwipeAction::Like, &premium, resets_at).is_ok());
    }

    #[test]
    fn superlikes_stop_at_one_free_or_five_premium() {
        let today = Utc::now().date_naive();
        let resets_at = next_reset(Utc::now());

        assert!(check_swipe(SwipeAction::Superlike, &allowance(&used(0, 0), false, 25, today), resets_at).is_ok());
        let err = check_swipe(SwipeAction::Superlike, &allowance(&used(0, 1), false, 25, today), resets_at)
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::DailySuperLikeLimitReached));

        assert!(check_swipe(SwipeAction::Superlike, &allowance(&used(0, 4), true, 25, today), resets_at).is_ok());
        let err = check_swipe(SwipeAction::Superlike, &allowance(&used(0, 5), true, 25, today), resets_at)
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::DailySuperLikeLimitReached));
    }

    #[test]
    fn pass_is_never_limited() {
        let today = Utc::now().date_naive();
        let exhausted = allowance(&used(25, 1), false, 25, today);
        assert!(check_swipe(SwipeAction::Pass, &exhausted, next_reset(Utc::now())).is_ok());
    }
}
