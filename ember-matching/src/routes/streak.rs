use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use ember_shared::errors::AppResult;
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;

use crate::matching::streak::{self, Allowance};
use crate::models::Streak;
use crate::services::streak_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StreakView {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
    pub bonus_likes: i32,
    pub likes_used: i32,
    pub superlikes_used: i32,
    #[serde(flatten)]
    pub allowance: Allowance,
    pub likes_reset_at: DateTime<Utc>,
}

pub fn streak_view(s: &Streak, is_premium: bool, free_daily_likes: i32, today: NaiveDate) -> StreakView {
    let current = streak::effective_streak(s, today);
    StreakView {
        current_streak: current,
        longest_streak: s.longest_streak,
        last_active_date: s.last_active_date,
        bonus_likes: streak::calculate_streak_bonus(current),
        likes_used: s.likes_used,
        superlikes_used: s.superlikes_used,
        allowance: streak::allowance(s, is_premium, free_daily_likes, today),
        likes_reset_at: s.likes_reset_at,
    }
}

async fn respond(user: AuthUser, state: Arc<AppState>, check_in: bool) -> AppResult<Json<ApiResponse<StreakView>>> {
    // Premium lookups here are advisory; an outage shows the free allowance.
    let is_premium = match state.users.profile(user.id).await {
        Ok(profile) => profile.is_some_and(|p| p.is_premium),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.id, "premium lookup failed");
            false
        }
    };

    let now = Utc::now();
    let s = {
        let mut conn = state.db.get()?;
        streak_service::current(&mut conn, user.id, now, check_in)?
    };

    if check_in {
        tracing::debug!(user_id = %user.id, streak = s.current_streak, "streak check-in");
    }

    Ok(Json(ApiResponse::ok(streak_view(
        &s,
        is_premium,
        state.config.free_daily_likes,
        now.date_naive(),
    ))))
}

// GET /streak
pub async fn get_streak(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<StreakView>>> {
    respond(user, state, false).await
}

// POST /streak/check-in
pub async fn check_in(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<StreakView>>> {
    respond(user, state, true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn view_reports_bonus_for_live_streak() {
        let now = Utc::now();
        let today = now.date_naive();
        let mut s = streak::new_streak(Uuid::now_v7(), now);
        s.current_streak = 8;
        s.longest_streak = 12;
        s.last_active_date = Some(today);
        s.likes_used = 3;

        let view = streak_view(&s, false, 25, today);
        assert_eq!(view.bonus_likes, 10);
        assert_eq!(view.allowance.allowed_likes, Some(35));
        assert_eq!(view.allowance.likes_remaining, Some(32));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["allowed_likes"], 35);
    }

    #[test]
    fn broken_streak_has_no_bonus() {
        let now = Utc::now();
        let today = now.date_naive();
        let mut s = streak::new_streak(Uuid::now_v7(), now);
        s.current_streak = 8;
        s.last_active_date = today.pred_opt().and_then(|d| d.pred_opt());

        let view = streak_view(&s, false, 25, today);
        assert_eq!(view.current_streak, 0);
        assert_eq!(view.bonus_likes, 0);
        assert_eq!(view.allowance.allowed_likes, Some(25));
    }

    #[test]
    fn premium_view_is_unlimited() {
        let now = Utc::now();
        let s = streak::new_streak(Uuid::now_v7(), now);
        let json = serde_json::to_value(streak_view(&s, true, 25, now.date_naive())).unwrap();
        assert!(json["allowed_likes"].is_null());
        assert_eq!(json["superlikes_remaining"], 5);
    }
}
