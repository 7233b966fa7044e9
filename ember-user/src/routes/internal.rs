use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use ember_shared::errors::AppResult;
use ember_shared::types::profile::{
    BatchProfilesRequest, CandidateProfile, CandidatesRequest, CandidatesResponse,
    DiscoveryViewer, ProfileSummary,
};
use ember_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Profile, ShowMe};
use crate::schema::profiles;
use crate::services::profile_service;
use crate::AppState;

/// Upper bound on rows scanned per candidates request before in-memory filtering.
const CANDIDATE_SCAN_LIMIT: i64 = 500;

/// POST /internal/profiles/batch (service-to-service, no auth)
pub async fn batch_profiles(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchProfilesRequest>,
) -> Json<Vec<ProfileSummary>> {
    let found: Vec<Profile> = match state.db.get() {
        Ok(mut conn) => profiles::table
            .filter(profiles::user_id.eq_any(&req.user_ids))
            .load::<Profile>(&mut conn)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to load batch profiles");
                vec![]
            }),
        Err(e) => {
            tracing::error!(error = %e, "failed to get db connection for batch profiles");
            return Json(vec![]);
        }
    };

    let ids: Vec<Uuid> = found.iter().map(|p| p.user_id).collect();
    let online = state.redis.online_flags(&ids).await;

    let summaries = found
        .iter()
        .zip(online)
        .map(|(p, is_online)| profile_service::summary(p, is_online))
        .collect();

    Json(summaries)
}

/// Onboarded profiles matching the viewer's gender preference, most recently
/// active first. Profiles that were never active sort last.
fn candidate_pool<'a>(viewer: &Profile, exclude: &'a Vec<Uuid>) -> profiles::BoxedQuery<'a, Pg> {
    let query = profiles::table
        .filter(profiles::onboarding_complete.eq(true))
        .filter(profiles::user_id.ne(viewer.user_id))
        .filter(profiles::user_id.ne_all(exclude))
        .into_boxed();

    let query = match viewer.show_me() {
        ShowMe::Men => query.filter(profiles::gender.eq("man")),
        ShowMe::Women => query.filter(profiles::gender.eq("woman")),
        ShowMe::Everyone => query,
    };

    query
        .order(profiles::last_active_at.desc().nulls_last())
        .limit(CANDIDATE_SCAN_LIMIT)
}

/// POST /internal/candidates: profiles the given user may be shown in discovery.
pub async fn candidates(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CandidatesRequest>,
) -> AppResult<Json<CandidatesResponse>> {
    let limit = req.limit.clamp(1, 100);
    let today = Utc::now().date_naive();

    let mut conn = state.db.get()?;
    let viewer = profile_service::require_profile(&mut conn, req.user_id)?;

    let pool: Vec<Profile> = candidate_pool(&viewer, &req.exclude).load(&mut conn)?;
    drop(conn);

    let matching: Vec<Profile> = pool
        .into_iter()
        .filter(|c| profile_service::are_mutually_discoverable(&viewer, c, today))
        .take(limit as usize)
        .collect();

    let ids: Vec<Uuid> = matching.iter().map(|p| p.user_id).collect();
    let online = state.redis.online_flags(&ids).await;

    let candidates = matching
        .iter()
        .zip(online)
        .map(|(p, is_online)| CandidateProfile {
            summary: profile_service::summary(p, is_online),
            bio: p.bio.clone(),
            interests: p.interest_list(),
            latitude: p.latitude,
            longitude: p.longitude,
            last_active_at: p.last_active_at,
        })
        .collect();

    let viewer = DiscoveryViewer {
        user_id: viewer.user_id,
        age: profile_service::age_today(viewer.birth_date),
        interests: viewer.interest_list(),
        latitude: viewer.latitude,
        longitude: viewer.longitude,
        max_distance_km: viewer.max_distance_km,
        is_premium: viewer.has_active_premium(Utc::now()),
    };

    Ok(Json(CandidatesResponse { viewer, candidates }))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePremiumRequest {
    pub user_id: Uuid,
    pub is_premium: bool,
    pub plan: Option<String>,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PremiumStatus {
    pub user_id: Uuid,
    pub is_premium: bool,
    pub premium_plan: Option<String>,
    pub premium_until: Option<DateTime<Utc>>,
}

/// PUT /internal/premium: set by the billing integration.
pub async fn update_premium(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePremiumRequest>,
) -> AppResult<Json<ApiResponse<PremiumStatus>>> {
    let mut conn = state.db.get()?;
    let profile = profile_service::get_or_create(&mut conn, req.user_id)?;

    let plan = if req.is_premium { req.plan } else { None };
    let until = if req.is_premium { req.premium_until } else { None };

    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            profiles::is_premium.eq(req.is_premium),
            profiles::premium_plan.eq(&plan),
            profiles::premium_until.eq(until),
            profiles::updated_at.eq(Utc::now()),
        ))
        .get_result::<Profile>(&mut conn)?;
    drop(conn);

    publisher::publish_premium_updated(&state.rabbitmq, updated.user_id, updated.is_premium, until)
        .await;

    tracing::info!(
        user_id = %updated.user_id,
        is_premium = updated.is_premium,
        plan = ?updated.premium_plan,
        "premium status updated"
    );

    Ok(Json(ApiResponse::ok(PremiumStatus {
        user_id: updated.user_id,
        is_premium: updated.is_premium,
        premium_plan: updated.premium_plan,
        premium_until: updated.premium_until,
    })))
}
