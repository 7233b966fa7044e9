use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::geo::{self, GeoPoint};
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;
use ember_shared::types::profile::{CandidateProfile, CandidatesRequest, DiscoveryViewer, ProfileSummary};

use crate::matching::algorithm;
use crate::services::match_service;
use crate::AppState;

/// Candidates requested per card returned, to leave room for the distance filter.
const OVERFETCH: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverCard {
    #[serde(flatten)]
    pub profile: ProfileSummary,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub distance_km: Option<i32>,
    pub score: u8,
}

/// Rank candidates by compatibility, dropping those beyond the viewer's radius.
pub fn rank_candidates(
    viewer: &DiscoveryViewer,
    candidates: Vec<CandidateProfile>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<DiscoverCard> {
    let origin = GeoPoint::from_options(viewer.latitude, viewer.longitude);

    let mut cards: Vec<DiscoverCard> = candidates
        .into_iter()
        .filter_map(|c| {
            let km = geo::distance_between(origin, GeoPoint::from_options(c.latitude, c.longitude));
            if km.is_some_and(|d| d > viewer.max_distance_km as f64) {
                return None;
            }
            let score = algorithm::compatibility_score(viewer, &c, km, now);
            Some(DiscoverCard {
                profile: c.summary,
                bio: c.bio,
                interests: c.interests,
                distance_km: km.map(geo::round_distance_km),
                score,
            })
        })
        .collect();

    cards.sort_by(|a, b| b.score.cmp(&a.score));
    cards.truncate(limit);
    cards
}

// ---------------------------------------------------------------------------
// GET /discover
// ---------------------------------------------------------------------------

pub async fn discover(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DiscoverQuery>,
) -> AppResult<Json<ApiResponse<Vec<DiscoverCard>>>> {
    let limit = query.limit.unwrap_or(state.config.default_discover_limit).clamp(1, 50);

    let exclude = {
        let mut conn = state.db.get()?;
        match_service::excluded_ids(&mut conn, user.id)?
    };

    let resp = state
        .users
        .candidates(&CandidatesRequest {
            user_id: user.id,
            exclude,
            limit: (limit * OVERFETCH).min(100),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "candidate lookup failed");
            AppError::new(ErrorCode::ServiceUnavailable, "profile service unavailable")
        })?;

    let cards = rank_candidates(&resp.viewer, resp.candidates, limit as usize, Utc::now());

    tracing::debug!(user_id = %user.id, count = cards.len(), "discovery cards served");

    Ok(Json(ApiResponse::ok(cards)))
}
