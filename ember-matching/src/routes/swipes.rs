use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;

use crate::events::publisher;
use crate::matching::reciprocity::PairChange;
use crate::matching::streak;
use crate::models::{Match, Swipe, SwipeAction};
use crate::services::{match_service, streak_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub target_id: Uuid,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub swipe: Swipe,
    pub matched: bool,
    #[serde(rename = "match")]
    pub match_record: Option<Match>,
    pub likes_remaining: Option<i32>,
    pub superlikes_remaining: i32,
}

struct SwipeOutcome {
    swipe: Swipe,
    change: PairChange,
    match_record: Option<Match>,
    allowance: streak::Allowance,
}

// ---------------------------------------------------------------------------
// POST /swipes
// ---------------------------------------------------------------------------

pub async fn swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeResponse>>> {
    if user.id == req.target_id {
        return Err(AppError::new(ErrorCode::CannotSwipeSelf, "you cannot swipe on yourself"));
    }

    let action: SwipeAction = req
        .action
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::InvalidSwipeAction, e))?;

    let profiles = state
        .users
        .batch_profiles(&[user.id, req.target_id])
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user service lookup failed");
            AppError::new(ErrorCode::ServiceUnavailable, "profile service unavailable")
        })?;

    if !profiles.iter().any(|p| p.user_id == req.target_id) {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "target profile not found"));
    }
    let is_premium = profiles
        .iter()
        .find(|p| p.user_id == user.id)
        .is_some_and(|p| p.is_premium);

    let free_daily_likes = state.config.free_daily_likes;
    let now = Utc::now();
    let today = now.date_naive();
    let target_id = req.target_id;

    let mut conn = state.db.get()?;
    let outcome = conn.transaction::<_, AppError, _>(|conn| {
        let mut s = streak_service::load_for_update(conn, user.id, now)?;
        streak::roll_over(&mut s, now);
        streak::record_activity(&mut s, today);

        let before = streak::allowance(&s, is_premium, free_daily_likes, today);
        streak::check_swipe(action, &before, s.likes_reset_at)?;

        let recorded = match_service::record_swipe(conn, user.id, target_id, action, now)?;

        match action {
            SwipeAction::Like => s.likes_used += 1,
            SwipeAction::Superlike => s.superlikes_used += 1,
            SwipeAction::Pass => {}
        }
        let s = streak_service::save(conn, &s, now)?;

        Ok(SwipeOutcome {
            swipe: recorded.swipe,
            change: recorded.change,
            match_record: recorded.match_record,
            allowance: streak::allowance(&s, is_premium, free_daily_likes, today),
        })
    })?;
    drop(conn);

    metrics::counter!("swipes_total", "action" => action.as_str()).increment(1);

    let matched = outcome.change == PairChange::Matched;
    if matched {
        if let Some(m) = &outcome.match_record {
            metrics::counter!("matches_total").increment(1);
            publisher::publish_match_created(&state.rabbitmq, m.id, user.id, target_id).await;
            tracing::info!(user_id = %user.id, target_id = %target_id, match_id = %m.id, "mutual match");
        }
    }

    tracing::debug!(
        user_id = %user.id,
        target_id = %target_id,
        action = action.as_str(),
        change = ?outcome.change,
        "swipe recorded"
    );

    Ok(Json(ApiResponse::ok(SwipeResponse {
        swipe: outcome.swipe,
        matched,
        match_record: outcome.match_record,
        likes_remaining: outcome.allowance.likes_remaining,
        superlikes_remaining: outcome.allowance.superlikes_remaining,
    })))
}
