use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;
use ember_shared::types::pagination::{Paginated, PaginationParams};
use ember_shared::types::profile::ProfileSummary;

use crate::events::publisher;
use crate::models::{Match, MatchStatus};
use crate::schema::matches;
use crate::services::match_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MatchView {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub profile: Option<ProfileSummary>,
    pub matched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ReceivedLike {
    pub user_id: Uuid,
    pub profile: Option<ProfileSummary>,
    pub liked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// GET /matches
// ---------------------------------------------------------------------------

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<MatchView>>>> {
    let (rows, total) = {
        let mut conn = state.db.get()?;
        let mutual = matches::table
            .filter(matches::user_id.eq(user.id))
            .filter(matches::status.eq(MatchStatus::Mutual.as_str()));

        let total: i64 = mutual.clone().count().get_result(&mut conn)?;
        let rows: Vec<Match> = mutual
            .order(matches::matched_at.desc())
            .offset(params.offset())
            .limit(params.limit())
            .load(&mut conn)?;
        (rows, total)
    };

    let ids: Vec<Uuid> = rows.iter().map(|m| m.other_user_id).collect();
    let mut profiles = state.users.profile_map(&ids).await;

    let items = rows
        .into_iter()
        .map(|m| MatchView {
            match_id: m.id,
            user_id: m.other_user_id,
            profile: profiles.remove(&m.other_user_id),
            matched_at: m.matched_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

// ---------------------------------------------------------------------------
// DELETE /matches/:user_id
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UnmatchResponse {
    pub unmatched: bool,
}

pub async fn unmatch(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UnmatchResponse>>> {
    let now = Utc::now();
    let updated = {
        let mut conn = state.db.get()?;
        conn.transaction::<_, AppError, _>(|conn| match_service::unmatch(conn, user.id, other_id, now))?
    };

    if updated.is_none() {
        return Err(AppError::new(ErrorCode::MatchNotFound, "no active match with this user"));
    }

    publisher::publish_match_ended(&state.rabbitmq, user.id, other_id, user.id).await;

    tracing::info!(user_id = %user.id, other_id = %other_id, "match ended");

    Ok(Json(ApiResponse::ok(UnmatchResponse { unmatched: true })))
}

// ---------------------------------------------------------------------------
// GET /likes/received (premium)
// ---------------------------------------------------------------------------

pub async fn likes_received(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ReceivedLike>>>> {
    let is_premium = state
        .users
        .profile(user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user service lookup failed");
            AppError::new(ErrorCode::ServiceUnavailable, "profile service unavailable")
        })?
        .is_some_and(|p| p.is_premium);

    if !is_premium {
        return Err(AppError::new(
            ErrorCode::PremiumRequired,
            "seeing who liked you requires premium",
        ));
    }

    let (rows, total) = {
        let mut conn = state.db.get()?;
        let pending = matches::table
            .filter(matches::other_user_id.eq(user.id))
            .filter(matches::status.eq(MatchStatus::Pending.as_str()));

        let total: i64 = pending.clone().count().get_result(&mut conn)?;
        let rows: Vec<Match> = pending
            .order(matches::updated_at.desc())
            .offset(params.offset())
            .limit(params.limit())
            .load(&mut conn)?;
        (rows, total)
    };

    let ids: Vec<Uuid> = rows.iter().map(|m| m.user_id).collect();
    let mut profiles = state.users.profile_map(&ids).await;

    let items = rows
        .into_iter()
        .map(|m| ReceivedLike {
            user_id: m.user_id,
            profile: profiles.remove(&m.user_id),
            liked_at: m.updated_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}
